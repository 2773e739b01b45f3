//! Storefront - Cart, Checkout and Order Lifecycle
//!
//! Turns a user's mutable shopping cart into an immutable order and then
//! governs that order through its status lifecycle.
//!
//! ## Features
//! - Per-user carts validated against live product stock
//! - Atomic checkout with price and name snapshots
//! - Order status state machine with guarded cancellation
//! - Filtered, paginated order queries
//! - Read-through catalog cache

pub mod catalog;
pub mod config;
pub mod domain;
pub mod dto;
pub mod http;
pub mod services;
pub mod store;

use thiserror::Error;

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum ShopError {
    #[error("quantity must be greater than 0")]
    InvalidQuantity,

    #[error("invalid order status: {0}")]
    InvalidOrderStatus(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("cart is empty")]
    CartEmpty,

    #[error("product not found")]
    ProductNotFound,

    #[error("user not found")]
    UserNotFound,

    #[error("address not found")]
    AddressNotFound,

    #[error("cart not found")]
    CartNotFound,

    #[error("cart item not found")]
    CartItemNotFound,

    #[error("order not found")]
    OrderNotFound,

    #[error("insufficient product stock")]
    InsufficientStock,

    #[error("order is already cancelled")]
    OrderAlreadyCancelled,

    #[error("order cannot be cancelled")]
    OrderCannotBeCancelled,

    #[error("order does not belong to user")]
    OrderNotOwnedByUser,

    #[error("unauthorized")]
    Unauthorized,

    #[error("access forbidden")]
    Forbidden,

    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Coarse classification of [`ShopError`] used for transport mapping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Ownership,
    Unauthenticated,
    Infrastructure,
}

impl ShopError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidQuantity | Self::InvalidOrderStatus(_) | Self::InvalidInput(_) | Self::CartEmpty => {
                ErrorKind::Validation
            }
            Self::ProductNotFound
            | Self::UserNotFound
            | Self::AddressNotFound
            | Self::CartNotFound
            | Self::CartItemNotFound
            | Self::OrderNotFound => ErrorKind::NotFound,
            Self::InsufficientStock | Self::OrderAlreadyCancelled | Self::OrderCannotBeCancelled => {
                ErrorKind::Conflict
            }
            Self::OrderNotOwnedByUser | Self::Forbidden => ErrorKind::Ownership,
            Self::Unauthorized => ErrorKind::Unauthenticated,
            Self::Storage(_) => ErrorKind::Infrastructure,
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into().into())
    }
}

impl From<sqlx::Error> for ShopError {
    fn from(error: sqlx::Error) -> Self {
        Self::Storage(Box::new(error))
    }
}

pub type Result<T> = std::result::Result<T, ShopError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(ShopError::InvalidQuantity.kind(), ErrorKind::Validation);
        assert_eq!(ShopError::CartEmpty.kind(), ErrorKind::Validation);
        assert_eq!(ShopError::CartItemNotFound.kind(), ErrorKind::NotFound);
        assert_eq!(ShopError::InsufficientStock.kind(), ErrorKind::Conflict);
        assert_eq!(ShopError::OrderCannotBeCancelled.kind(), ErrorKind::Conflict);
        assert_eq!(ShopError::OrderNotOwnedByUser.kind(), ErrorKind::Ownership);
        assert_eq!(ShopError::storage("disk on fire").kind(), ErrorKind::Infrastructure);
    }
}
