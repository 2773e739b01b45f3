//! In-process store with the same transactional contract as Postgres.
//!
//! A unit of work holds the store lock for its whole lifetime and mutates a
//! private copy of the state; commit swaps the copy in. Units of work are
//! therefore serialised, and dropping one discards its changes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::catalog::ProductAccessor;
use crate::domain::aggregates::{Address, Cart, CartLine, NewOrder, Order, OrderLine, OrderStatus, Product, ProductUpdate, User};
use crate::domain::filters::OrderFilters;
use crate::domain::value_objects::{Money, Quantity};
use crate::store::{CartRepository, Directory, OrderRepository, Store, UnitOfWork};
use crate::{Result, ShopError};

/// Write steps at which a one-shot failure can be injected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailPoint { InsertOrder, InsertOrderLines, ClearCart }

#[derive(Clone, Debug)]
struct CartRow { id: i64, uuid: Uuid, user_id: i64, created_at: DateTime<Utc> }

#[derive(Clone, Debug)]
struct OrderRow {
    id: i64, uuid: Uuid, user_id: i64, address_id: Option<i64>, total_price: Money,
    status: OrderStatus, created_at: DateTime<Utc>, updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default)]
struct MemoryState {
    last_id: i64,
    users: BTreeMap<i64, User>,
    addresses: BTreeMap<i64, Address>,
    products: BTreeMap<i64, Product>,
    carts: BTreeMap<i64, CartRow>,
    cart_lines: BTreeMap<(i64, i64), Quantity>,
    orders: BTreeMap<i64, OrderRow>,
    order_lines: Vec<(i64, OrderLine)>,
    pending_failure: Option<FailPoint>,
    cancel_overtaken_by: Option<OrderStatus>,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 { self.last_id += 1; self.last_id }

    fn cart_for_user(&self, user_id: i64) -> Option<&CartRow> { self.carts.values().find(|c| c.user_id == user_id) }

    fn assemble_order(&self, row: &OrderRow) -> Order {
        Order {
            id: row.id, uuid: row.uuid, user_id: row.user_id, address_id: row.address_id,
            total_price: row.total_price, status: row.status, created_at: row.created_at, updated_at: row.updated_at,
            lines: self.order_lines.iter().filter(|(id, _)| *id == row.id).map(|(_, l)| l.clone()).collect(),
            address: row.address_id.and_then(|a| self.addresses.get(&a).cloned()),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct MemoryStore { state: Arc<Mutex<MemoryState>> }

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    pub async fn add_user(&self, email: &str, name: &str) -> User {
        let mut s = self.state.lock().await;
        let user = User { id: s.next_id(), uuid: Uuid::new_v4(), email: email.into(), name: name.into(), created_at: Utc::now() };
        s.users.insert(user.id, user.clone());
        user
    }

    pub async fn add_address(&self, user_id: i64, address: &str) -> Address {
        let mut s = self.state.lock().await;
        let addr = Address {
            id: s.next_id(), uuid: Uuid::new_v4(), user_id, address: address.into(),
            city: None, postal_code: None, country: None, created_at: Utc::now(),
        };
        s.addresses.insert(addr.id, addr.clone());
        addr
    }

    pub async fn add_product(&self, name: &str, price: Decimal, stock: i32) -> Product {
        let mut s = self.state.lock().await;
        let now = Utc::now();
        let product = Product {
            id: s.next_id(), uuid: Uuid::new_v4(), name: name.into(), description: None,
            price: Money::new(price), stock, created_at: now, updated_at: now,
        };
        s.products.insert(product.id, product.clone());
        product
    }

    /// Makes the next unit of work that reaches `point` fail with a storage error.
    pub async fn fail_at(&self, point: FailPoint) { self.state.lock().await.pending_failure = Some(point); }

    /// Makes the next conditional cancel find `status` already stored, as if
    /// another unit of work committed it after this one read the order.
    pub async fn overtake_next_cancel(&self, status: OrderStatus) {
        self.state.lock().await.cancel_overtaken_by = Some(status);
    }

    pub async fn order_count(&self) -> usize { self.state.lock().await.orders.len() }
    pub async fn order_line_count(&self) -> usize { self.state.lock().await.order_lines.len() }
}

pub struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

impl MemoryTx {
    fn trip(&mut self, point: FailPoint) -> Result<()> {
        if self.working.pending_failure == Some(point) {
            self.working.pending_failure = None;
            self.guard.pending_failure = None;
            return Err(ShopError::storage(format!("injected failure at {point:?}")));
        }
        Ok(())
    }
}

#[async_trait]
impl Store for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<MemoryTx> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(MemoryTx { guard, working })
    }
}

#[async_trait]
impl UnitOfWork for MemoryTx {
    async fn commit(self) -> Result<()> {
        let MemoryTx { mut guard, working } = self;
        *guard = working;
        Ok(())
    }
}

#[async_trait]
impl CartRepository for MemoryTx {
    async fn find_cart(&mut self, user_id: i64) -> Result<Option<Cart>> {
        let s = &self.working;
        let Some(row) = s.cart_for_user(user_id) else { return Ok(None) };
        let mut lines = Vec::new();
        for ((_, product_id), quantity) in s.cart_lines.range((row.id, i64::MIN)..=(row.id, i64::MAX)) {
            let product = s.products.get(product_id).cloned().ok_or(ShopError::ProductNotFound)?;
            lines.push(CartLine { product, quantity: *quantity });
        }
        Ok(Some(Cart::new(row.id, row.uuid, row.user_id, row.created_at, lines)))
    }

    async fn find_cart_id(&mut self, user_id: i64) -> Result<Option<i64>> {
        Ok(self.working.cart_for_user(user_id).map(|c| c.id))
    }

    async fn create_cart(&mut self, user_id: i64) -> Result<Cart> {
        if self.working.cart_for_user(user_id).is_none() {
            if !self.working.users.contains_key(&user_id) { return Err(ShopError::UserNotFound); }
            let row = CartRow { id: self.working.next_id(), uuid: Uuid::new_v4(), user_id, created_at: Utc::now() };
            self.working.carts.insert(row.id, row);
        }
        self.find_cart(user_id).await?.ok_or(ShopError::CartNotFound)
    }

    async fn upsert_cart_line(&mut self, cart_id: i64, product_id: i64, quantity: Quantity) -> Result<()> {
        if !self.working.carts.contains_key(&cart_id) { return Err(ShopError::CartNotFound); }
        if !self.working.products.contains_key(&product_id) { return Err(ShopError::ProductNotFound); }
        self.working.cart_lines.entry((cart_id, product_id)).and_modify(|q| *q = q.merge(quantity)).or_insert(quantity);
        Ok(())
    }

    async fn set_cart_line_quantity(&mut self, cart_id: i64, product_id: i64, quantity: Quantity) -> Result<bool> {
        match self.working.cart_lines.get_mut(&(cart_id, product_id)) {
            Some(q) => { *q = quantity; Ok(true) }
            None => Ok(false),
        }
    }

    async fn delete_cart_line(&mut self, cart_id: i64, product_id: i64) -> Result<u64> {
        Ok(u64::from(self.working.cart_lines.remove(&(cart_id, product_id)).is_some()))
    }

    async fn clear_cart(&mut self, cart_id: i64) -> Result<u64> {
        self.trip(FailPoint::ClearCart)?;
        let before = self.working.cart_lines.len();
        self.working.cart_lines.retain(|(c, _), _| *c != cart_id);
        Ok((before - self.working.cart_lines.len()) as u64)
    }
}

#[async_trait]
impl OrderRepository for MemoryTx {
    async fn insert_order(&mut self, order: &NewOrder) -> Result<i64> {
        self.trip(FailPoint::InsertOrder)?;
        if !self.working.users.contains_key(&order.user_id) { return Err(ShopError::UserNotFound); }
        if !self.working.addresses.contains_key(&order.address_id) { return Err(ShopError::AddressNotFound); }
        let id = self.working.next_id();
        self.working.orders.insert(id, OrderRow {
            id, uuid: order.uuid, user_id: order.user_id, address_id: Some(order.address_id),
            total_price: order.total_price, status: order.status, created_at: order.created_at, updated_at: order.created_at,
        });
        Ok(id)
    }

    async fn insert_order_lines(&mut self, order_id: i64, lines: &[OrderLine]) -> Result<()> {
        self.trip(FailPoint::InsertOrderLines)?;
        if !self.working.orders.contains_key(&order_id) { return Err(ShopError::OrderNotFound); }
        self.working.order_lines.extend(lines.iter().cloned().map(|l| (order_id, l)));
        Ok(())
    }

    async fn find_order(&mut self, order_id: i64) -> Result<Option<Order>> {
        Ok(self.working.orders.get(&order_id).map(|row| self.working.assemble_order(row)))
    }

    async fn order_status(&mut self, order_id: i64) -> Result<Option<OrderStatus>> {
        Ok(self.working.orders.get(&order_id).map(|row| row.status))
    }

    async fn list_orders(&mut self, filters: &OrderFilters) -> Result<(Vec<Order>, i64)> {
        let mut matching: Vec<Order> = self.working.orders.values()
            .map(|row| self.working.assemble_order(row))
            .filter(|o| filters.matches(o))
            .collect();
        matching.sort_by(|a, b| filters.compare(a, b));
        let total = matching.len() as i64;
        let offset = usize::try_from(filters.offset()).unwrap_or(usize::MAX);
        let page = matching.into_iter().skip(offset).take(filters.limit as usize).collect();
        Ok((page, total))
    }

    async fn set_order_status(&mut self, order_id: i64, status: OrderStatus, at: DateTime<Utc>) -> Result<bool> {
        match self.working.orders.get_mut(&order_id) {
            Some(row) => { row.status = status; row.updated_at = at; Ok(true) }
            None => Ok(false),
        }
    }

    async fn cancel_order(&mut self, order_id: i64, at: DateTime<Utc>) -> Result<bool> {
        if let Some(status) = self.working.cancel_overtaken_by.take() {
            self.guard.cancel_overtaken_by = None;
            for state in [&mut *self.guard, &mut self.working] {
                if let Some(row) = state.orders.get_mut(&order_id) { row.status = status; }
            }
        }
        match self.working.orders.get_mut(&order_id) {
            Some(row) if row.status.is_cancellable() => { row.status = OrderStatus::Cancelled; row.updated_at = at; Ok(true) }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl Directory for MemoryTx {
    async fn find_product(&mut self, product_id: i64) -> Result<Option<Product>> { Ok(self.working.products.get(&product_id).cloned()) }
    async fn find_user(&mut self, user_id: i64) -> Result<Option<User>> { Ok(self.working.users.get(&user_id).cloned()) }
    async fn find_address(&mut self, address_id: i64) -> Result<Option<Address>> { Ok(self.working.addresses.get(&address_id).cloned()) }
}

#[async_trait]
impl ProductAccessor for MemoryStore {
    async fn get_product(&self, product_id: i64) -> Result<Product> {
        self.state.lock().await.products.get(&product_id).cloned().ok_or(ShopError::ProductNotFound)
    }

    async fn update_product(&self, product_id: i64, update: &ProductUpdate) -> Result<Product> {
        let mut s = self.state.lock().await;
        let product = s.products.get_mut(&product_id).ok_or(ShopError::ProductNotFound)?;
        update.apply(product, Utc::now());
        Ok(product.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_uncommitted_work_is_discarded() {
        let store = MemoryStore::new();
        let user = store.add_user("a@example.com", "A").await;
        {
            let mut tx = store.begin().await.unwrap();
            tx.create_cart(user.id).await.unwrap();
        }
        let mut tx = store.begin().await.unwrap();
        assert!(tx.find_cart(user.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_commit_publishes_changes() {
        let store = MemoryStore::new();
        let user = store.add_user("a@example.com", "A").await;
        let product = store.add_product("Widget", Decimal::new(10, 0), 5).await;
        let mut tx = store.begin().await.unwrap();
        let cart = tx.create_cart(user.id).await.unwrap();
        tx.upsert_cart_line(cart.id(), product.id, Quantity::new(2).unwrap()).await.unwrap();
        tx.upsert_cart_line(cart.id(), product.id, Quantity::new(1).unwrap()).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let cart = tx.find_cart(user.id).await.unwrap().unwrap();
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].quantity.value(), 3);
    }

    #[tokio::test]
    async fn test_create_cart_is_idempotent() {
        let store = MemoryStore::new();
        let user = store.add_user("a@example.com", "A").await;
        let mut tx = store.begin().await.unwrap();
        let first = tx.create_cart(user.id).await.unwrap();
        let second = tx.create_cart(user.id).await.unwrap();
        assert_eq!(first.id(), second.id());
        assert!(matches!(tx.create_cart(user.id + 100).await, Err(ShopError::UserNotFound)));
    }

    #[tokio::test]
    async fn test_fail_point_is_one_shot() {
        let store = MemoryStore::new();
        let user = store.add_user("a@example.com", "A").await;
        store.fail_at(FailPoint::ClearCart).await;
        let mut tx = store.begin().await.unwrap();
        let cart = tx.create_cart(user.id).await.unwrap();
        assert!(matches!(tx.clear_cart(cart.id()).await, Err(ShopError::Storage(_))));
        drop(tx);
        let mut tx = store.begin().await.unwrap();
        let cart = tx.create_cart(user.id).await.unwrap();
        assert_eq!(tx.clear_cart(cart.id()).await.unwrap(), 0);
    }
}
