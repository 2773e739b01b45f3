//! Domain events
use crate::domain::aggregates::OrderStatus;
use crate::domain::value_objects::Money;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq)]
pub enum OrderEvent {
    Placed { order_id: i64, uuid: Uuid, user_id: i64, total: Money, lines: usize },
    Cancelled { order_id: i64, user_id: i64, previous: OrderStatus },
    StatusChanged { order_id: i64, status: OrderStatus },
}

impl OrderEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Placed { .. } => "order.placed",
            Self::Cancelled { .. } => "order.cancelled",
            Self::StatusChanged { .. } => "order.status_changed",
        }
    }

    pub fn order_id(&self) -> i64 {
        match self {
            Self::Placed { order_id, .. } | Self::Cancelled { order_id, .. } | Self::StatusChanged { order_id, .. } => *order_id,
        }
    }

    /// Records the event on the `storefront::events` target. Call only after commit.
    pub fn emit(&self) {
        tracing::info!(target: "storefront::events", event = self.name(), order_id = self.order_id(), detail = ?self);
    }
}
