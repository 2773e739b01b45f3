//! Application services. Each public operation runs in exactly one unit of
//! work and commits only on success.

pub mod cart;
pub mod order;

pub use cart::CartService;
pub use order::OrderService;
