//! Product catalog access with an optional read-through cache.
//!
//! Cart and order workflows read products inside their own unit of work; the
//! accessor here serves the catalog endpoints. Cache failures never fail a
//! request: they are logged and the backing store answers instead.

use async_trait::async_trait;
use mockall::automock;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::domain::aggregates::{Product, ProductUpdate};
use crate::Result;

pub mod redis;

pub use self::redis::RedisCache;

#[automock]
#[async_trait]
pub trait ProductAccessor: Send + Sync {
    /// Fails with `ProductNotFound` when no such product exists.
    async fn get_product(&self, product_id: i64) -> Result<Product>;

    async fn update_product(&self, product_id: i64, update: &ProductUpdate) -> Result<Product>;
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(#[from] ::redis::RedisError),

    #[error("cache payload error: {0}")]
    Payload(#[from] serde_json::Error),
}

pub type CacheResult<T> = std::result::Result<T, CacheError>;

#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;
    async fn set(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()>;
    async fn delete(&self, key: &str) -> CacheResult<()>;
}

pub fn product_key(product_id: i64) -> String {
    format!("storefront:product:{product_id}")
}

/// Read-through cache in front of another [`ProductAccessor`]. Updates
/// invalidate the cached entry.
pub struct CachedProducts<A, C> {
    inner: A,
    cache: C,
    ttl: Duration,
}

impl<A, C> CachedProducts<A, C> {
    pub fn new(inner: A, cache: C, ttl: Duration) -> Self {
        Self { inner, cache, ttl }
    }
}

impl<A: ProductAccessor, C: CacheBackend> CachedProducts<A, C> {
    async fn cached(&self, key: &str) -> CacheResult<Option<Product>> {
        match self.cache.get(key).await? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn store(&self, key: &str, product: &Product) -> CacheResult<()> {
        let json = serde_json::to_string(product)?;
        self.cache.set(key, json, self.ttl).await
    }
}

#[async_trait]
impl<A: ProductAccessor, C: CacheBackend> ProductAccessor for CachedProducts<A, C> {
    async fn get_product(&self, product_id: i64) -> Result<Product> {
        let key = product_key(product_id);
        match self.cached(&key).await {
            Ok(Some(product)) => {
                debug!(product_id, "product cache hit");
                return Ok(product);
            }
            Ok(None) => debug!(product_id, "product cache miss"),
            Err(error) => warn!(product_id, %error, "product cache read failed"),
        }

        let product = self.inner.get_product(product_id).await?;
        if let Err(error) = self.store(&key, &product).await {
            warn!(product_id, %error, "product cache write failed");
        }
        Ok(product)
    }

    async fn update_product(&self, product_id: i64, update: &ProductUpdate) -> Result<Product> {
        let product = self.inner.update_product(product_id, update).await?;
        if let Err(error) = self.cache.delete(&product_key(product_id)).await {
            warn!(product_id, %error, "product cache invalidation failed");
        }
        Ok(product)
    }
}

/// Process-local cache backend with per-entry expiry.
///
/// A TTL too large to represent as an `Instant` never expires.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, (String, Option<Instant>)>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some((value, expires)) if expires.map_or(true, |at| at > Instant::now()) => Ok(Some(value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()> {
        self.entries.lock().await.insert(key.to_string(), (value, Instant::now().checked_add(ttl)));
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.entries.lock().await.remove(key);
        Ok(())
    }
}
