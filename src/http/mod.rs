//! HTTP surface: routing, extractors and error mapping.

use axum::extract::{FromRequest, FromRequestParts};
use axum::routing::{get, patch, post, put};
use axum::Router;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::catalog::ProductAccessor;
use crate::services::{CartService, OrderService};
use crate::store::Store;
use crate::ShopError;

pub mod auth;
pub mod error;
mod handlers;

pub use auth::{AdminUser, AuthUser, USER_ID_HEADER, USER_ROLE_HEADER};

#[derive(Clone)]
pub struct AppState<S> {
    pub carts: CartService<S>,
    pub orders: OrderService<S>,
    pub catalog: Arc<dyn ProductAccessor>,
}

impl<S: Store + Clone> AppState<S> {
    pub fn new(store: S, catalog: Arc<dyn ProductAccessor>, enforce_address_ownership: bool) -> Self {
        Self {
            carts: CartService::new(store.clone()),
            orders: OrderService::new(store).with_address_ownership(enforce_address_ownership),
            catalog,
        }
    }
}

/// JSON body whose rejections render as [`ShopError`].
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ShopError))]
pub struct JsonBody<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ShopError))]
pub struct PathParam<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ShopError))]
pub struct QueryParams<T>(pub T);

pub fn router<S: Store + Clone>(state: AppState<S>) -> Router {
    let api = Router::new()
        .route("/cart", get(handlers::get_cart::<S>).delete(handlers::clear_cart::<S>))
        .route("/cart/items", post(handlers::add_cart_item::<S>))
        .route("/cart/items/:product_id", put(handlers::update_cart_item::<S>).delete(handlers::remove_cart_item::<S>))
        .route("/orders", get(handlers::list_orders::<S>).post(handlers::create_order::<S>))
        .route("/orders/:id", get(handlers::get_order::<S>))
        .route("/orders/:id/cancel", post(handlers::cancel_order::<S>))
        .route("/orders/:id/status", patch(handlers::update_order_status::<S>))
        .route("/admin/orders", get(handlers::list_all_orders::<S>))
        .route("/products/:id", get(handlers::get_product::<S>).patch(handlers::update_product::<S>));

    Router::new()
        .route("/health", get(handlers::health))
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
