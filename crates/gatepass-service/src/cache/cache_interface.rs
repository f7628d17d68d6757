//! Cache interface trait for abstracted caching operations.

use async_trait::async_trait;
use gatepass_core::{GatepassResult, Interface};
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Cache interface for storing and retrieving cached data.
///
/// Values are stored as JSON strings so the trait stays dyn-compatible.
#[async_trait]
pub trait CacheInterface: Interface + Send + Sync {
    /// Get a raw JSON value from the cache.
    ///
    /// Returns `None` if the key doesn't exist or has expired.
    async fn get_raw(&self, key: &str) -> GatepassResult<Option<String>>;

    /// Set a raw JSON value in the cache with a TTL.
    async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> GatepassResult<()>;

    /// Delete a value from the cache.
    ///
    /// Returns `true` if the key existed and was deleted.
    async fn delete(&self, key: &str) -> GatepassResult<bool>;

    /// Check if caching is enabled.
    fn is_enabled(&self) -> bool;
}

/// Typed helpers on top of [`CacheInterface`].
///
/// `read_through` and `invalidate` never fail because of the cache: errors
/// are logged and the caller falls back to the store.
#[async_trait]
pub trait CacheExt: CacheInterface {
    /// Get a typed value from the cache.
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> GatepassResult<Option<T>> {
        match self.get_raw(key).await? {
            Some(json) => {
                let value: T = serde_json::from_str(&json)?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Set a typed value in the cache.
    async fn set<T: Serialize + Send + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> GatepassResult<()> {
        let json = serde_json::to_string(value)?;
        self.set_raw(key, &json, ttl).await
    }

    /// Returns the cached value for `key`, or loads it and populates the cache.
    ///
    /// A loader returning `None` is not cached.
    async fn read_through<T, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        load: F,
    ) -> GatepassResult<Option<T>>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = GatepassResult<Option<T>>> + Send,
    {
        match self.get::<T>(key).await {
            Ok(Some(cached)) => return Ok(Some(cached)),
            Ok(None) => {}
            Err(e) => warn!("Cache read failed for '{}', falling back to store: {}", key, e),
        }

        let loaded = load().await?;

        if let Some(value) = &loaded {
            if let Err(e) = self.set(key, value, ttl).await {
                warn!("Cache populate failed for '{}': {}", key, e);
            }
        }

        Ok(loaded)
    }

    /// Stores `value` under `key`, logging instead of failing.
    async fn put<T: Serialize + Send + Sync>(&self, key: &str, value: &T, ttl: Duration) {
        if let Err(e) = self.set(key, value, ttl).await {
            warn!("Cache populate failed for '{}': {}", key, e);
        }
    }

    /// Deletes every key, logging instead of failing.
    async fn invalidate(&self, keys: &[String]) {
        for key in keys {
            match self.delete(key).await {
                Ok(_) => debug!("Invalidated cache key '{}'", key),
                Err(e) => warn!("Cache invalidation failed for '{}': {}", key, e),
            }
        }
    }
}

// Blanket implementation for all CacheInterface implementations
impl<T: CacheInterface + ?Sized> CacheExt for T {}
