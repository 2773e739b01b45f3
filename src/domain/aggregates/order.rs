//! Order Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::aggregates::{Address, Cart};
use crate::domain::value_objects::{Money, Quantity};
use crate::{Result, ShopError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus { Pending, Paid, Shipped, Delivered, Cancelled }

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [Self::Pending, Self::Paid, Self::Shipped, Self::Delivered, Self::Cancelled];

    /// Statuses from which a customer may cancel.
    pub const CANCELLABLE: [OrderStatus; 2] = [Self::Pending, Self::Paid];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_cancellable(&self) -> bool { Self::CANCELLABLE.contains(self) }
    pub fn is_terminal(&self) -> bool { matches!(self, Self::Delivered | Self::Cancelled) }

    /// Gate for the customer-facing cancel path.
    pub fn check_cancel(&self) -> Result<()> {
        match self {
            Self::Cancelled => Err(ShopError::OrderAlreadyCancelled),
            s if s.is_cancellable() => Ok(()),
            _ => Err(ShopError::OrderCannotBeCancelled),
        }
    }
}

impl FromStr for OrderStatus {
    type Err = ShopError;
    fn from_str(s: &str) -> Result<Self> {
        Self::ALL.into_iter().find(|st| st.as_str() == s).ok_or_else(|| ShopError::InvalidOrderStatus(s.to_string()))
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Snapshot of a product at purchase time. Never refreshed from the catalog.
#[derive(Clone, Debug, PartialEq)]
pub struct OrderLine {
    pub product_id: i64,
    pub product_name: String,
    pub price_at_order: Money,
    pub quantity: Quantity,
}

impl OrderLine {
    pub fn subtotal(&self) -> Money { self.price_at_order.times(self.quantity) }
}

/// An order built from a cart, not yet persisted.
#[derive(Clone, Debug)]
pub struct NewOrder {
    pub uuid: Uuid,
    pub user_id: i64,
    pub address_id: i64,
    pub total_price: Money,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub lines: Vec<OrderLine>,
}

impl NewOrder {
    /// Snapshots every cart line at its live price. The same snapshot feeds
    /// both the total and the lines, so `total_price` equals the sum of line
    /// subtotals by construction.
    pub fn from_cart(cart: &Cart, address_id: i64, at: DateTime<Utc>) -> Result<Self> {
        if cart.is_empty() { return Err(ShopError::CartEmpty); }
        let lines: Vec<OrderLine> = cart.lines().iter().map(|l| OrderLine {
            product_id: l.product.id,
            product_name: l.product.name.clone(),
            price_at_order: l.product.price,
            quantity: l.quantity,
        }).collect();
        let total_price = lines.iter().map(OrderLine::subtotal).sum();
        Ok(Self { uuid: Uuid::new_v4(), user_id: cart.user_id(), address_id, total_price, status: OrderStatus::Pending, created_at: at, lines })
    }

    pub fn into_order(self, id: i64, address: Option<Address>) -> Order {
        Order {
            id, uuid: self.uuid, user_id: self.user_id, address_id: Some(self.address_id),
            total_price: self.total_price, status: self.status,
            created_at: self.created_at, updated_at: self.created_at,
            lines: self.lines, address,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Order {
    pub id: i64,
    pub uuid: Uuid,
    pub user_id: i64,
    pub address_id: Option<i64>,
    pub total_price: Money,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub lines: Vec<OrderLine>,
    pub address: Option<Address>,
}

impl Order {
    pub fn ensure_owned_by(&self, user_id: i64) -> Result<()> {
        if self.user_id != user_id { return Err(ShopError::OrderNotOwnedByUser); }
        Ok(())
    }

    pub fn lines_total(&self) -> Money { self.lines.iter().map(OrderLine::subtotal).sum() }
}
