use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use rust_decimal::Decimal;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

use storefront::domain::aggregates::{Address, Product, User};
use storefront::http::{router, AppState, USER_ID_HEADER, USER_ROLE_HEADER};
use storefront::store::MemoryStore;

pub struct TestApp {
    pub app: Router,
    pub store: MemoryStore,
    pub user: User,
    pub address: Address,
    pub admin: User,
    /// 10.00, 5 in stock.
    pub kettle: Product,
    /// 5.50, 3 in stock.
    pub mug: Product,
}

pub async fn spawn() -> TestApp {
    let store = MemoryStore::new();
    let user = store.add_user("ada@example.com", "Ada").await;
    let address = store.add_address(user.id, "1 Analytical Way").await;
    let admin = store.add_user("ops@example.com", "Ops").await;
    let kettle = store.add_product("Kettle", Decimal::new(1000, 2), 5).await;
    let mug = store.add_product("Mug", Decimal::new(550, 2), 3).await;

    let app = router(AppState::new(store.clone(), Arc::new(store.clone()), false));
    TestApp { app, store, user, address, admin, kettle, mug }
}

pub enum Caller {
    Anonymous,
    User(i64),
    Admin(i64),
}

impl TestApp {
    pub async fn call(&self, method: Method, uri: &str, caller: Caller, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        match caller {
            Caller::Anonymous => {}
            Caller::User(id) => builder = builder.header(USER_ID_HEADER, id.to_string()),
            Caller::Admin(id) => {
                builder = builder.header(USER_ID_HEADER, id.to_string()).header(USER_ROLE_HEADER, "admin")
            }
        }
        let request = match body {
            Some(json) => builder.header("content-type", "application/json").body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
        let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, json)
    }

    pub fn as_user(&self) -> Caller {
        Caller::User(self.user.id)
    }

    pub fn as_admin(&self) -> Caller {
        Caller::Admin(self.admin.id)
    }
}
