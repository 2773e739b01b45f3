//! Order list filters

use chrono::{DateTime, Utc};
use std::str::FromStr;

use crate::domain::aggregates::{Order, OrderStatus};
use crate::domain::value_objects::Money;
use crate::{Result, ShopError};

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 100;

/// Columns an order list may be sorted by.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortColumn { Id, CreatedAt, UpdatedAt, TotalPrice, Status }

impl SortColumn {
    pub fn column(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
            Self::TotalPrice => "total_price",
            Self::Status => "status",
        }
    }
}

impl FromStr for SortColumn {
    type Err = ShopError;
    fn from_str(s: &str) -> Result<Self> {
        [Self::Id, Self::CreatedAt, Self::UpdatedAt, Self::TotalPrice, Self::Status]
            .into_iter()
            .find(|c| c.column() == s)
            .ok_or_else(|| ShopError::InvalidInput(format!("cannot sort by '{s}'")))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortDirection { Asc, Desc }

impl SortDirection {
    pub fn keyword(&self) -> &'static str {
        match self { Self::Asc => "ASC", Self::Desc => "DESC" }
    }
}

impl FromStr for SortDirection {
    type Err = ShopError;
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(ShopError::InvalidInput(format!("invalid sort order '{s}'"))),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct OrderFilters {
    pub page: u32,
    pub limit: u32,
    pub user_id: Option<i64>,
    pub status: Option<OrderStatus>,
    /// Inclusive lower bound on `created_at`.
    pub created_from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `created_at`.
    pub created_before: Option<DateTime<Utc>>,
    pub min_amount: Option<Money>,
    pub max_amount: Option<Money>,
    pub sort_by: SortColumn,
    pub sort_direction: SortDirection,
}

impl Default for OrderFilters {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE, limit: DEFAULT_LIMIT, user_id: None, status: None,
            created_from: None, created_before: None, min_amount: None, max_amount: None,
            sort_by: SortColumn::CreatedAt, sort_direction: SortDirection::Desc,
        }
    }
}

impl OrderFilters {
    pub fn scoped_to(mut self, user_id: i64) -> Self { self.user_id = Some(user_id); self }

    pub fn offset(&self) -> u64 { u64::from(self.page.saturating_sub(1)) * u64::from(self.limit) }

    /// Same predicate the SQL adapter builds, for in-process stores.
    pub fn matches(&self, order: &Order) -> bool {
        self.user_id.map_or(true, |u| order.user_id == u)
            && self.status.map_or(true, |s| order.status == s)
            && self.created_from.map_or(true, |t| order.created_at >= t)
            && self.created_before.map_or(true, |t| order.created_at < t)
            && self.min_amount.map_or(true, |m| order.total_price >= m)
            && self.max_amount.map_or(true, |m| order.total_price <= m)
    }

    pub fn compare(&self, a: &Order, b: &Order) -> std::cmp::Ordering {
        let ord = match self.sort_by {
            SortColumn::Id => a.id.cmp(&b.id),
            SortColumn::CreatedAt => a.created_at.cmp(&b.created_at),
            SortColumn::UpdatedAt => a.updated_at.cmp(&b.updated_at),
            SortColumn::TotalPrice => a.total_price.cmp(&b.total_price),
            SortColumn::Status => a.status.as_str().cmp(b.status.as_str()),
        }
        .then(a.id.cmp(&b.id));
        match self.sort_direction { SortDirection::Asc => ord, SortDirection::Desc => ord.reverse() }
    }
}
