//! Cart Aggregate

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::aggregates::Product;
use crate::domain::value_objects::{Money, Quantity};

/// A user's cart with every line resolved against the live catalog.
#[derive(Clone, Debug)]
pub struct Cart {
    id: i64,
    uuid: Uuid,
    user_id: i64,
    lines: Vec<CartLine>,
    created_at: DateTime<Utc>,
}

/// One product in a cart. Price and name are read live, never stored.
#[derive(Clone, Debug, PartialEq)]
pub struct CartLine {
    pub product: Product,
    pub quantity: Quantity,
}

impl CartLine {
    pub fn subtotal(&self) -> Money { self.product.price.times(self.quantity) }
}

impl Cart {
    pub fn new(id: i64, uuid: Uuid, user_id: i64, created_at: DateTime<Utc>, lines: Vec<CartLine>) -> Self {
        Self { id, uuid, user_id, lines, created_at }
    }

    pub fn id(&self) -> i64 { self.id }
    pub fn uuid(&self) -> Uuid { self.uuid }
    pub fn user_id(&self) -> i64 { self.user_id }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn lines(&self) -> &[CartLine] { &self.lines }
    pub fn is_empty(&self) -> bool { self.lines.is_empty() }

    pub fn total(&self) -> Money { self.lines.iter().map(CartLine::subtotal).sum() }

    /// Number of units across all lines.
    pub fn item_count(&self) -> i64 { self.lines.iter().map(|l| i64::from(l.quantity.value())).sum() }
}
