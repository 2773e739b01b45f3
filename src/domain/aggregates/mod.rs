//! Aggregates module
pub mod product;
pub mod order;
pub mod cart;

pub use product::{Address, Product, ProductUpdate, User};
pub use order::{NewOrder, Order, OrderLine, OrderStatus};
pub use cart::{Cart, CartLine};
