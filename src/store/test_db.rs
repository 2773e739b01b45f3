//! Throwaway Postgres databases for adapter tests.
//!
//! One container is started per test binary and every test gets its own
//! freshly migrated database inside it. When no container runtime is
//! reachable, [`test_pool`] returns `None` and callers skip.

use sqlx::{Connection, PgConnection, PgPool};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use testcontainers::core::{IntoContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage, ImageExt};
use tokio::sync::OnceCell;

const CREDENTIALS: &str = "storefront:storefront";

struct Server {
    _container: ContainerAsync<GenericImage>,
    authority: String,
}

impl Server {
    fn url(&self, database: &str) -> String {
        format!("postgres://{CREDENTIALS}@{}/{database}", self.authority)
    }
}

static SERVER: OnceCell<Option<Server>> = OnceCell::const_new();
static NEXT_DATABASE: AtomicU32 = AtomicU32::new(0);

async fn start_server() -> Option<Server> {
    let started = GenericImage::new("postgres", "16")
        .with_exposed_port(5432.tcp())
        .with_wait_for(WaitFor::message_on_stdout("database system is ready to accept connections"))
        .with_env_var("POSTGRES_USER", "storefront")
        .with_env_var("POSTGRES_PASSWORD", "storefront")
        .with_env_var("POSTGRES_DB", "storefront")
        .with_startup_timeout(Duration::from_secs(60))
        .start()
        .await;
    let container = match started {
        Ok(container) => container,
        Err(error) => {
            eprintln!("skipping postgres tests, no container runtime: {error}");
            return None;
        }
    };
    let host = container.get_host().await.expect("container host");
    let port = container.get_host_port_ipv4(5432).await.expect("mapped postgres port");
    let server = Server { _container: container, authority: format!("{host}:{port}") };

    // The image logs readiness once for its init server before the real one starts.
    for _ in 0..60 {
        if let Ok(conn) = PgConnection::connect(&server.url("storefront")).await {
            conn.close().await.ok();
            return Some(server);
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
    panic!("postgres container never accepted connections");
}

/// Creates and migrates an isolated database.
pub(crate) async fn test_pool() -> Option<PgPool> {
    let server = SERVER.get_or_init(start_server).await.as_ref()?;
    let name = format!("storefront_test_{}_{}", std::process::id(), NEXT_DATABASE.fetch_add(1, Ordering::Relaxed));

    let mut admin = PgConnection::connect(&server.url("storefront")).await.expect("admin connection");
    sqlx::query(&format!("CREATE DATABASE {name}")).execute(&mut admin).await.expect("create test database");
    admin.close().await.ok();

    let pool = PgPool::connect(&server.url(&name)).await.expect("test database pool");
    sqlx::migrate!("./migrations").run(&pool).await.expect("migrations");
    Some(pool)
}
