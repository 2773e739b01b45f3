//! Storefront - cart, checkout and order lifecycle service

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storefront::catalog::{CachedProducts, MemoryCache, ProductAccessor, RedisCache};
use storefront::config::Config;
use storefront::http::{router, AppState};
use storefront::store::PgStore;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();

    let db = PgPoolOptions::new().max_connections(config.max_connections).connect(&config.database_url).await.context("connecting to postgres")?;
    sqlx::migrate!("./migrations").run(&db).await.context("running migrations")?;
    let store = PgStore::new(db);

    let catalog: Arc<dyn ProductAccessor> = match &config.redis_url {
        Some(url) => match RedisCache::connect(url).await {
            Ok(cache) => Arc::new(CachedProducts::new(store.clone(), cache, config.product_cache_ttl)),
            Err(error) => {
                tracing::warn!(%error, "redis unavailable, using in-process product cache");
                Arc::new(CachedProducts::new(store.clone(), MemoryCache::new(), config.product_cache_ttl))
            }
        },
        None => Arc::new(store.clone()),
    };

    let app = router(AppState::new(store, catalog, config.enforce_address_ownership));

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    tracing::info!("storefront listening on 0.0.0.0:{}", config.port);
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "failed to listen for shutdown signal");
    }
    tracing::info!("shutting down");
}
