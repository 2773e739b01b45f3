//! Caller identity.
//!
//! Authentication happens upstream; the gateway forwards the verified user id
//! and role as headers.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::ShopError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AuthUser(pub i64);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AdminUser(pub i64);

#[async_trait]
impl<St: Send + Sync> FromRequestParts<St> for AuthUser {
    type Rejection = ShopError;

    async fn from_request_parts(parts: &mut Parts, _state: &St) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<i64>().ok())
            .filter(|id| *id > 0)
            .map(AuthUser)
            .ok_or(ShopError::Unauthorized)
    }
}

#[async_trait]
impl<St: Send + Sync> FromRequestParts<St> for AdminUser {
    type Rejection = ShopError;

    async fn from_request_parts(parts: &mut Parts, state: &St) -> Result<Self, Self::Rejection> {
        let AuthUser(id) = AuthUser::from_request_parts(parts, state).await?;
        let is_admin = parts
            .headers
            .get(USER_ROLE_HEADER)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|role| role.trim().eq_ignore_ascii_case("admin"));
        if !is_admin {
            return Err(ShopError::Forbidden);
        }
        Ok(AdminUser(id))
    }
}
