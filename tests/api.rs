mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

use common::{spawn, Caller, TestApp};

async fn checkout(t: &TestApp) -> i64 {
    let (status, _) = t.call(Method::POST, "/api/v1/cart/items", t.as_user(), Some(json!({"product_id": t.kettle.id, "quantity": 2}))).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = t.call(Method::POST, "/api/v1/cart/items", t.as_user(), Some(json!({"product_id": t.mug.id, "quantity": 1}))).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, order) = t.call(Method::POST, "/api/v1/orders", t.as_user(), Some(json!({"address_id": t.address.id}))).await;
    assert_eq!(status, StatusCode::CREATED);
    order["id"].as_i64().unwrap()
}

#[tokio::test]
async fn test_health() {
    let t = spawn().await;
    let (status, body) = t.call(Method::GET, "/health", Caller::Anonymous, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_requests_without_identity_are_rejected() {
    let t = spawn().await;
    let (status, body) = t.call(Method::GET, "/api/v1/cart", Caller::Anonymous, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");
    let (status, _) = t.call(Method::POST, "/api/v1/orders", Caller::Anonymous, Some(json!({"address_id": 1}))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_cart_flow() {
    let t = spawn().await;
    let (status, cart) = t.call(Method::GET, "/api/v1/cart", t.as_user(), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["items"].as_array().unwrap().len(), 0);
    assert_eq!(cart["total_price"], "0.00");

    t.call(Method::POST, "/api/v1/cart/items", t.as_user(), Some(json!({"product_id": t.kettle.id, "quantity": 2}))).await;
    let (_, cart) = t.call(Method::POST, "/api/v1/cart/items", t.as_user(), Some(json!({"product_id": t.mug.id, "quantity": 1}))).await;
    assert_eq!(cart["total_price"], "25.50");
    assert_eq!(cart["total_items"], 3);
    assert_eq!(cart["items"][0]["subtotal"], "20.00");

    let uri = format!("/api/v1/cart/items/{}", t.kettle.id);
    let (status, cart) = t.call(Method::PUT, &uri, t.as_user(), Some(json!({"quantity": 1}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["total_price"], "15.50");

    let (status, _) = t.call(Method::DELETE, &uri, t.as_user(), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, cart) = t.call(Method::DELETE, &uri, t.as_user(), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["items"].as_array().unwrap().len(), 1);

    let (status, body) = t.call(Method::DELETE, "/api/v1/cart", t.as_user(), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_null());
    let (_, cart) = t.call(Method::GET, "/api/v1/cart", t.as_user(), None).await;
    assert_eq!(cart["total_items"], 0);
}

#[tokio::test]
async fn test_cart_errors() {
    let t = spawn().await;
    let add = |product_id: i64, quantity: i32| Some(json!({"product_id": product_id, "quantity": quantity}));

    let (status, body) = t.call(Method::POST, "/api/v1/cart/items", t.as_user(), add(t.mug.id, 4)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "insufficient product stock");

    let (status, _) = t.call(Method::POST, "/api/v1/cart/items", t.as_user(), add(t.mug.id, 0)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = t.call(Method::POST, "/api/v1/cart/items", t.as_user(), add(9999, 1)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = t.call(Method::POST, "/api/v1/cart/items", t.as_user(), Some(json!({"quantity": "two"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let uri = format!("/api/v1/cart/items/{}", t.mug.id);
    let (status, body) = t.call(Method::PUT, &uri, t.as_user(), Some(json!({"quantity": 1}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "cart not found");

    t.call(Method::GET, "/api/v1/cart", t.as_user(), None).await;
    let (status, body) = t.call(Method::PUT, &uri, t.as_user(), Some(json!({"quantity": 1}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "cart item not found");

    let (status, _) = t.call(Method::PUT, "/api/v1/cart/items/abc", t.as_user(), Some(json!({"quantity": 1}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_checkout() {
    let t = spawn().await;
    let (status, body) = t.call(Method::POST, "/api/v1/orders", t.as_user(), Some(json!({"address_id": t.address.id}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "cart is empty");

    t.call(Method::POST, "/api/v1/cart/items", t.as_user(), Some(json!({"product_id": t.kettle.id, "quantity": 2}))).await;
    t.call(Method::POST, "/api/v1/cart/items", t.as_user(), Some(json!({"product_id": t.mug.id, "quantity": 1}))).await;

    let (status, _) = t.call(Method::POST, "/api/v1/orders", t.as_user(), Some(json!({"address_id": 9999}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = t.call(Method::POST, "/api/v1/orders", t.as_user(), Some(json!({"address_id": 0}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, order) = t.call(Method::POST, "/api/v1/orders", t.as_user(), Some(json!({"address_id": t.address.id}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(order["status"], "pending");
    assert_eq!(order["total_price"], "25.50");
    assert_eq!(order["items"].as_array().unwrap().len(), 2);
    assert_eq!(order["items"][0]["price_at_order"], "10.00");
    assert_eq!(order["items"][0]["subtotal"], "20.00");
    assert_eq!(order["address"]["address"], "1 Analytical Way");

    let (_, cart) = t.call(Method::GET, "/api/v1/cart", t.as_user(), None).await;
    assert_eq!(cart["items"].as_array().unwrap().len(), 0);
    assert_eq!(t.store.order_count().await, 1);
    assert_eq!(t.store.order_line_count().await, 2);
}

#[tokio::test]
async fn test_order_queries() {
    let t = spawn().await;
    let id = checkout(&t).await;

    let (status, list) = t.call(Method::GET, "/api/v1/orders", t.as_user(), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["total_count"], 1);
    assert_eq!(list["total_amount"], "25.50");
    assert_eq!(list["page"], 1);
    assert_eq!(list["limit"], 10);

    let (_, list) = t.call(Method::GET, "/api/v1/orders?status=paid", t.as_user(), None).await;
    assert_eq!(list["total_count"], 0);
    assert_eq!(list["total_amount"], "0.00");

    let (status, _) = t.call(Method::GET, "/api/v1/orders?sort_by=password", t.as_user(), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = t.call(Method::GET, "/api/v1/orders?status=lost", t.as_user(), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, others) = t.call(Method::GET, "/api/v1/orders", Caller::User(t.admin.id), None).await;
    assert_eq!(others["total_count"], 0);

    let uri = format!("/api/v1/orders/{id}");
    let (status, order) = t.call(Method::GET, &uri, t.as_user(), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["id"], id);
    let (status, _) = t.call(Method::GET, &uri, Caller::User(t.admin.id), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = t.call(Method::GET, "/api/v1/orders/9999", t.as_user(), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cancellation() {
    let t = spawn().await;
    let id = checkout(&t).await;
    let cancel = format!("/api/v1/orders/{id}/cancel");

    let (status, order) = t.call(Method::POST, &cancel, t.as_user(), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["status"], "cancelled");

    let (status, body) = t.call(Method::POST, &cancel, t.as_user(), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "order is already cancelled");

    let id = checkout(&t).await;
    let (status, _) = t.call(Method::PATCH, &format!("/api/v1/orders/{id}/status"), t.as_admin(), Some(json!({"status": "delivered"}))).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = t.call(Method::POST, &format!("/api/v1/orders/{id}/cancel"), t.as_user(), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "order cannot be cancelled");
    let (_, order) = t.call(Method::GET, &format!("/api/v1/orders/{id}"), t.as_user(), None).await;
    assert_eq!(order["status"], "delivered");
}

#[tokio::test]
async fn test_admin_endpoints() {
    let t = spawn().await;
    let id = checkout(&t).await;
    let status_uri = format!("/api/v1/orders/{id}/status");

    let (status, _) = t.call(Method::PATCH, &status_uri, t.as_user(), Some(json!({"status": "paid"}))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = t.call(Method::PATCH, &status_uri, t.as_admin(), Some(json!({"status": "lost"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid order status: lost");
    let (status, _) = t.call(Method::PATCH, "/api/v1/orders/9999/status", t.as_admin(), Some(json!({"status": "paid"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, order) = t.call(Method::PATCH, &status_uri, t.as_admin(), Some(json!({"status": "paid"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["status"], "paid");

    let (status, _) = t.call(Method::GET, "/api/v1/admin/orders", t.as_user(), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, list) = t.call(Method::GET, "/api/v1/admin/orders?status=paid&sort_by=total_price&sort_order=asc", t.as_admin(), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["total_count"], 1);
    assert_eq!(list["orders"][0]["user_id"], t.user.id);
    let uri = format!("/api/v1/admin/orders?user_id={}", t.admin.id);
    let (_, list) = t.call(Method::GET, &uri, t.as_admin(), None).await;
    assert_eq!(list["total_count"], 0);
}

#[tokio::test]
async fn test_product_endpoints() {
    let t = spawn().await;
    let uri = format!("/api/v1/products/{}", t.kettle.id);

    let (status, product) = t.call(Method::GET, &uri, Caller::Anonymous, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(product["price"], "10.00");
    let (status, _) = t.call(Method::GET, "/api/v1/products/9999", Caller::Anonymous, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = t.call(Method::PATCH, &uri, t.as_user(), Some(json!({"stock": 1}))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = t.call(Method::PATCH, &uri, t.as_admin(), Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = t.call(Method::PATCH, &uri, t.as_admin(), Some(json!({"price": "10000000000.00"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, product) = t.call(Method::PATCH, &uri, t.as_admin(), Some(json!({"price": "12.00", "stock": 1}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(product["price"], "12.00");
    assert_eq!(product["stock"], 1);

    let (status, _) = t.call(Method::POST, "/api/v1/cart/items", t.as_user(), Some(json!({"product_id": t.kettle.id, "quantity": 2}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
}
