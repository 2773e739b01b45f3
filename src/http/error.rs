//! Error responses.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::{ErrorKind, ShopError};

impl ErrorKind {
    #[must_use]
    pub const fn status_code(self) -> StatusCode {
        match self {
            Self::Validation => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
            Self::Ownership => StatusCode::FORBIDDEN,
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Infrastructure => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ShopError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        // Storage details stay in the log.
        let message = if kind == ErrorKind::Infrastructure {
            tracing::error!(error = %self, "request failed");
            "internal server error".to_string()
        } else {
            self.to_string()
        };
        (kind.status_code(), Json(json!({ "error": message }))).into_response()
    }
}

impl From<JsonRejection> for ShopError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidInput(rejection.body_text())
    }
}

impl From<PathRejection> for ShopError {
    fn from(rejection: PathRejection) -> Self {
        Self::InvalidInput(rejection.body_text())
    }
}

impl From<QueryRejection> for ShopError {
    fn from(rejection: QueryRejection) -> Self {
        Self::InvalidInput(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        let cases = [
            (ShopError::InvalidQuantity, StatusCode::BAD_REQUEST),
            (ShopError::InvalidOrderStatus("lost".into()), StatusCode::BAD_REQUEST),
            (ShopError::CartEmpty, StatusCode::BAD_REQUEST),
            (ShopError::ProductNotFound, StatusCode::NOT_FOUND),
            (ShopError::AddressNotFound, StatusCode::NOT_FOUND),
            (ShopError::InsufficientStock, StatusCode::CONFLICT),
            (ShopError::OrderAlreadyCancelled, StatusCode::CONFLICT),
            (ShopError::OrderNotOwnedByUser, StatusCode::FORBIDDEN),
            (ShopError::Unauthorized, StatusCode::UNAUTHORIZED),
            (ShopError::storage("connection reset"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }

    #[tokio::test]
    async fn test_storage_details_are_hidden() {
        let response = ShopError::storage("password authentication failed").into_response();
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["error"], "internal server error");
    }
}
