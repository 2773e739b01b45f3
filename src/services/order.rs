//! Order Builder, Order Lifecycle and Order Query

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::domain::aggregates::{NewOrder, Order, OrderStatus};
use crate::domain::events::OrderEvent;
use crate::domain::filters::OrderFilters;
use crate::store::{CartRepository, Directory, OrderRepository, Store, UnitOfWork};
use crate::{Result, ShopError};

#[derive(Clone, Debug)]
pub struct OrderService<S> {
    store: S,
    enforce_address_ownership: bool,
}

impl<S: Store> OrderService<S> {
    pub fn new(store: S) -> Self {
        Self { store, enforce_address_ownership: false }
    }

    /// Rejects addresses that belong to another user with `AddressNotFound`.
    pub fn with_address_ownership(mut self, enforce: bool) -> Self {
        self.enforce_address_ownership = enforce;
        self
    }

    /// Converts the user's cart into a pending order.
    ///
    /// Header insert, line insert and cart clear share one unit of work: any
    /// failure leaves neither an order nor a cleared cart behind. Prices and
    /// names are snapshotted from the product rows read in that same unit of
    /// work. Stock is not decremented.
    #[tracing::instrument(skip(self))]
    pub async fn create_order(&self, user_id: i64, address_id: i64) -> Result<Order> {
        let mut tx = self.store.begin().await?;

        let Some(cart) = tx.find_cart(user_id).await?.filter(|c| !c.is_empty()) else {
            warn!(user_id, "refusing to order from an empty cart");
            return Err(ShopError::CartEmpty);
        };
        tx.find_user(user_id).await?.ok_or(ShopError::UserNotFound)?;
        let address = tx.find_address(address_id).await?.ok_or(ShopError::AddressNotFound)?;
        if self.enforce_address_ownership && address.user_id != user_id {
            warn!(user_id, address_id, owner = address.user_id, "order placed against a foreign address");
            return Err(ShopError::AddressNotFound);
        }

        let new_order = NewOrder::from_cart(&cart, address_id, Utc::now())?;
        debug!(user_id, total = %new_order.total_price, lines = new_order.lines.len(), "priced cart");
        let order_id = tx.insert_order(&new_order).await?;
        debug!(order_id, "inserted order header");
        tx.insert_order_lines(order_id, &new_order.lines).await?;
        debug!(order_id, "inserted order lines");
        tx.clear_cart(cart.id()).await?;
        tx.commit().await?;
        info!(order_id, user_id, total = %new_order.total_price, "order placed");

        let order = new_order.into_order(order_id, Some(address));
        OrderEvent::Placed {
            order_id,
            uuid: order.uuid,
            user_id,
            total: order.total_price,
            lines: order.lines.len(),
        }
        .emit();
        Ok(order)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, user_id: i64, order_id: i64) -> Result<Order> {
        let mut tx = self.store.begin().await?;
        let order = tx.find_order(order_id).await?.ok_or(ShopError::OrderNotFound)?;
        tx.commit().await?;
        order.ensure_owned_by(user_id)?;
        Ok(order)
    }

    /// Orders of one user; any `user_id` in the filters is overridden.
    #[tracing::instrument(skip(self))]
    pub async fn list_user_orders(&self, user_id: i64, filters: OrderFilters) -> Result<(Vec<Order>, i64)> {
        self.list(filters.scoped_to(user_id)).await
    }

    /// Unscoped listing for administrators.
    #[tracing::instrument(skip(self))]
    pub async fn list_all_orders(&self, filters: OrderFilters) -> Result<(Vec<Order>, i64)> {
        self.list(filters).await
    }

    async fn list(&self, filters: OrderFilters) -> Result<(Vec<Order>, i64)> {
        let mut tx = self.store.begin().await?;
        let (orders, total) = tx.list_orders(&filters).await?;
        tx.commit().await?;
        debug!(returned = orders.len(), total, "listed orders");
        Ok((orders, total))
    }

    /// Customer-facing cancellation, allowed only from `pending` or `paid`.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_order(&self, user_id: i64, order_id: i64) -> Result<Order> {
        let mut tx = self.store.begin().await?;
        let order = tx.find_order(order_id).await?.ok_or(ShopError::OrderNotFound)?;
        order.ensure_owned_by(user_id)?;
        if let Err(refused) = order.status.check_cancel() {
            warn!(order_id, status = %order.status, "cancellation refused");
            return Err(refused);
        }

        if !tx.cancel_order(order_id, Utc::now()).await? {
            // Status moved since the read; report against the current one.
            let current = tx.order_status(order_id).await?.ok_or(ShopError::OrderNotFound)?;
            current.check_cancel()?;
            return Err(ShopError::OrderCannotBeCancelled);
        }
        let cancelled = tx.find_order(order_id).await?.ok_or(ShopError::OrderNotFound)?;
        tx.commit().await?;

        info!(order_id, user_id, previous = %order.status, "order cancelled");
        OrderEvent::Cancelled { order_id, user_id, previous: order.status }.emit();
        Ok(cancelled)
    }

    /// Administrative override. Any known status may be written from any other.
    #[tracing::instrument(skip(self))]
    pub async fn update_order_status(&self, order_id: i64, status: &str) -> Result<Order> {
        let status: OrderStatus = status.parse()?;
        let mut tx = self.store.begin().await?;
        let previous = tx.order_status(order_id).await?.ok_or(ShopError::OrderNotFound)?;
        if previous.is_terminal() && previous != status {
            warn!(order_id, %previous, %status, "overriding terminal order status");
        }
        if !tx.set_order_status(order_id, status, Utc::now()).await? {
            return Err(ShopError::OrderNotFound);
        }
        let order = tx.find_order(order_id).await?.ok_or(ShopError::OrderNotFound)?;
        tx.commit().await?;

        info!(order_id, %previous, %status, "order status updated");
        OrderEvent::StatusChanged { order_id, status }.emit();
        Ok(order)
    }
}
