use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::json;

use super::{AdminUser, AppState, AuthUser, JsonBody, PathParam, QueryParams};
use crate::domain::aggregates::ProductUpdate;
use crate::domain::filters::OrderFilters;
use crate::dto::{
    validated, AddToCartRequest, CartView, CreateOrderRequest, OrderListParams, OrderListView, OrderView,
    ProductView, UpdateCartItemRequest, UpdateOrderStatusRequest, UpdateProductRequest,
};
use crate::store::Store;
use crate::{Result, ShopError};

fn positive_id(id: i64) -> Result<i64> {
    if id <= 0 {
        return Err(ShopError::InvalidInput(format!("invalid id {id}")));
    }
    Ok(id)
}

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({"status": "healthy", "service": "storefront"}))
}

// ---- cart ----

pub async fn get_cart<S: Store>(State(s): State<AppState<S>>, AuthUser(user): AuthUser) -> Result<Json<CartView>> {
    let cart = s.carts.get_cart(user).await?;
    Ok(Json(CartView::from(&cart)))
}

pub async fn add_cart_item<S: Store>(
    State(s): State<AppState<S>>, AuthUser(user): AuthUser, JsonBody(r): JsonBody<AddToCartRequest>,
) -> Result<(StatusCode, Json<CartView>)> {
    let cart = s.carts.add_item(user, positive_id(r.product_id)?, r.quantity).await?;
    Ok((StatusCode::CREATED, Json(CartView::from(&cart))))
}

pub async fn update_cart_item<S: Store>(
    State(s): State<AppState<S>>, AuthUser(user): AuthUser, PathParam(product_id): PathParam<i64>,
    JsonBody(r): JsonBody<UpdateCartItemRequest>,
) -> Result<Json<CartView>> {
    let cart = s.carts.update_item(user, positive_id(product_id)?, r.quantity).await?;
    Ok(Json(CartView::from(&cart)))
}

pub async fn remove_cart_item<S: Store>(
    State(s): State<AppState<S>>, AuthUser(user): AuthUser, PathParam(product_id): PathParam<i64>,
) -> Result<Json<CartView>> {
    let cart = s.carts.remove_item(user, positive_id(product_id)?).await?;
    Ok(Json(CartView::from(&cart)))
}

pub async fn clear_cart<S: Store>(State(s): State<AppState<S>>, AuthUser(user): AuthUser) -> Result<StatusCode> {
    s.carts.clear_cart(user).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---- orders ----

pub async fn create_order<S: Store>(
    State(s): State<AppState<S>>, AuthUser(user): AuthUser, JsonBody(r): JsonBody<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderView>)> {
    let r = validated(r)?;
    let order = s.orders.create_order(user, r.address_id).await?;
    Ok((StatusCode::CREATED, Json(OrderView::from(&order))))
}

pub async fn list_orders<S: Store>(
    State(s): State<AppState<S>>, AuthUser(user): AuthUser, QueryParams(p): QueryParams<OrderListParams>,
) -> Result<Json<OrderListView>> {
    let filters = OrderFilters::try_from(p)?;
    let (orders, total) = s.orders.list_user_orders(user, filters.clone()).await?;
    Ok(Json(OrderListView::assemble(&orders, total, &filters)))
}

pub async fn get_order<S: Store>(
    State(s): State<AppState<S>>, AuthUser(user): AuthUser, PathParam(id): PathParam<i64>,
) -> Result<Json<OrderView>> {
    let order = s.orders.get_order(user, positive_id(id)?).await?;
    Ok(Json(OrderView::from(&order)))
}

pub async fn cancel_order<S: Store>(
    State(s): State<AppState<S>>, AuthUser(user): AuthUser, PathParam(id): PathParam<i64>,
) -> Result<Json<OrderView>> {
    let order = s.orders.cancel_order(user, positive_id(id)?).await?;
    Ok(Json(OrderView::from(&order)))
}

pub async fn update_order_status<S: Store>(
    State(s): State<AppState<S>>, AdminUser(admin): AdminUser, PathParam(id): PathParam<i64>,
    JsonBody(r): JsonBody<UpdateOrderStatusRequest>,
) -> Result<Json<OrderView>> {
    let r = validated(r)?;
    tracing::info!(admin, order_id = id, status = %r.status, "status override requested");
    let order = s.orders.update_order_status(positive_id(id)?, &r.status).await?;
    Ok(Json(OrderView::from(&order)))
}

pub async fn list_all_orders<S: Store>(
    State(s): State<AppState<S>>, AdminUser(_): AdminUser, QueryParams(p): QueryParams<OrderListParams>,
) -> Result<Json<OrderListView>> {
    let filters = OrderFilters::try_from(p)?;
    let (orders, total) = s.orders.list_all_orders(filters.clone()).await?;
    Ok(Json(OrderListView::assemble(&orders, total, &filters)))
}

// ---- catalog ----

pub async fn get_product<S: Store>(State(s): State<AppState<S>>, PathParam(id): PathParam<i64>) -> Result<Json<ProductView>> {
    let product = s.catalog.get_product(positive_id(id)?).await?;
    Ok(Json(ProductView::from(&product)))
}

pub async fn update_product<S: Store>(
    State(s): State<AppState<S>>, AdminUser(_): AdminUser, PathParam(id): PathParam<i64>,
    JsonBody(r): JsonBody<UpdateProductRequest>,
) -> Result<Json<ProductView>> {
    let update = ProductUpdate::try_from(validated(r)?)?;
    let product = s.catalog.update_product(positive_id(id)?, &update).await?;
    Ok(Json(ProductView::from(&product)))
}
