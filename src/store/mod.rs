//! Storage ports.
//!
//! Every service operation runs inside one [`UnitOfWork`] obtained from a
//! [`Store`]. Writes become visible only on [`UnitOfWork::commit`]; a unit of
//! work dropped before commit (early return, error, cancelled request future)
//! is rolled back.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::aggregates::{Address, Cart, NewOrder, Order, OrderLine, OrderStatus, Product, User};
use crate::domain::filters::OrderFilters;
use crate::domain::value_objects::Quantity;
use crate::Result;

pub mod memory;
pub mod postgres;
#[cfg(test)]
mod test_db;

pub use memory::{FailPoint, MemoryStore};
pub use postgres::PgStore;

#[async_trait]
pub trait Store: Send + Sync + 'static {
    type Tx: UnitOfWork;

    async fn begin(&self) -> Result<Self::Tx>;
}

#[async_trait]
pub trait UnitOfWork: CartRepository + OrderRepository + Directory + Sized {
    async fn commit(self) -> Result<()>;
}

#[async_trait]
pub trait CartRepository: Send {
    /// Loads the user's cart with lines joined to live product rows.
    async fn find_cart(&mut self, user_id: i64) -> Result<Option<Cart>>;

    async fn find_cart_id(&mut self, user_id: i64) -> Result<Option<i64>>;

    /// Insert-or-fetch of the user's single cart row.
    async fn create_cart(&mut self, user_id: i64) -> Result<Cart>;

    /// Adds to the existing line for the product, or creates it.
    async fn upsert_cart_line(&mut self, cart_id: i64, product_id: i64, quantity: Quantity) -> Result<()>;

    /// Returns `false` when the cart has no line for the product.
    async fn set_cart_line_quantity(&mut self, cart_id: i64, product_id: i64, quantity: Quantity) -> Result<bool>;

    /// Returns the number of lines removed (0 or 1).
    async fn delete_cart_line(&mut self, cart_id: i64, product_id: i64) -> Result<u64>;

    async fn clear_cart(&mut self, cart_id: i64) -> Result<u64>;
}

#[async_trait]
pub trait OrderRepository: Send {
    async fn insert_order(&mut self, order: &NewOrder) -> Result<i64>;

    /// Batch insert of all lines of one order.
    async fn insert_order_lines(&mut self, order_id: i64, lines: &[OrderLine]) -> Result<()>;

    /// Loads header, lines and address.
    async fn find_order(&mut self, order_id: i64) -> Result<Option<Order>>;

    async fn order_status(&mut self, order_id: i64) -> Result<Option<OrderStatus>>;

    /// One page of orders matching the filters plus the unpaged match count.
    async fn list_orders(&mut self, filters: &OrderFilters) -> Result<(Vec<Order>, i64)>;

    /// Unconditional write. Returns `false` when the order does not exist.
    async fn set_order_status(&mut self, order_id: i64, status: OrderStatus, at: DateTime<Utc>) -> Result<bool>;

    /// Conditional write to `cancelled`, applied only while the stored status
    /// is still cancellable. Returns whether the row changed.
    async fn cancel_order(&mut self, order_id: i64, at: DateTime<Utc>) -> Result<bool>;
}

/// Read accessors for records owned by other parts of the system.
#[async_trait]
pub trait Directory: Send {
    async fn find_product(&mut self, product_id: i64) -> Result<Option<Product>>;
    async fn find_user(&mut self, user_id: i64) -> Result<Option<User>>;
    async fn find_address(&mut self, address_id: i64) -> Result<Option<Address>>;
}
