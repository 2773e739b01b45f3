//! Catalog and identity records read by the cart and order workflows

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::{Money, Quantity};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub uuid: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: Money,
    pub stock: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Advisory check; nothing is reserved.
    pub fn has_stock_for(&self, qty: Quantity) -> bool { qty.value() <= self.stock }
}

/// Partial catalog update. `None` leaves the field untouched.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub price: Option<Money>,
    pub stock: Option<i32>,
}

impl ProductUpdate {
    pub fn is_empty(&self) -> bool { self.name.is_none() && self.price.is_none() && self.stock.is_none() }

    pub fn apply(&self, product: &mut Product, at: DateTime<Utc>) {
        if let Some(name) = &self.name { product.name = name.clone(); }
        if let Some(price) = self.price { product.price = price; }
        if let Some(stock) = self.stock { product.stock = stock; }
        product.updated_at = at;
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct User {
    pub id: i64,
    pub uuid: Uuid,
    pub email: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Address {
    pub id: i64,
    pub uuid: Uuid,
    pub user_id: i64,
    pub address: String,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub created_at: DateTime<Utc>,
}
