//! Namespaced key/value cache shared by the cooldown engine and extensions.

use std::sync::Arc;
use std::sync::Weak;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use log::debug;
use log::warn;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio::time::MissedTickBehavior;

use crate::config::CacheConfig;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CacheError {
    #[error("Cache backend error: {0}")]
    Backend(String),

    #[error("Failed to (de)serialize cached value: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Async key/value store. Namespaces isolate unrelated users of the same store.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str, namespace: &str) -> Result<Option<Value>, CacheError>;

    /// Stores `value`; `ttl` of `None` keeps it until deleted.
    async fn set(
        &self,
        key: &str,
        value: Value,
        namespace: &str,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError>;

    /// Returns whether an entry was removed.
    async fn delete(&self, key: &str, namespace: &str) -> Result<bool, CacheError>;
}

/// Convenience helpers available on every [`Cache`].
#[async_trait]
pub trait CacheExt: Cache {
    async fn get_or(&self, key: &str, default: Value, namespace: &str) -> Result<Value, CacheError> {
        Ok(self.get(key, namespace).await?.unwrap_or(default))
    }

    async fn get_as<T>(&self, key: &str, namespace: &str) -> Result<Option<T>, CacheError>
    where
        T: DeserializeOwned + Send,
    {
        match self.get(key, namespace).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    async fn set_as<T>(
        &self,
        key: &str,
        value: &T,
        namespace: &str,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError>
    where
        T: Serialize + Sync + ?Sized,
    {
        let value = serde_json::to_value(value)?;
        self.set(key, value, namespace, ttl).await
    }
}

impl<C: Cache + ?Sized> CacheExt for C {}

struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// In-process cache. Expired entries are evicted lazily on read and by [`MemoryCache::purge_expired`],
/// which [`MemoryCache::spawn_purge`] runs periodically.
#[derive(Default)]
pub struct MemoryCache {
    entries: DashMap<(String, String), Entry>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes every expired entry and returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        before.saturating_sub(self.entries.len())
    }

    /// Sweeps expired entries every `every` until the cache is dropped.
    pub fn spawn_purge(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let cache: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let Some(cache) = cache.upgrade() else {
                    break;
                };
                let purged = cache.purge_expired();
                if purged > 0 {
                    debug!("Purged {} expired cache entries", purged);
                }
            }
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry_key(key: &str, namespace: &str) -> (String, String) {
        (namespace.to_string(), key.to_string())
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str, namespace: &str) -> Result<Option<Value>, CacheError> {
        let entry_key = Self::entry_key(key, namespace);
        let now = Instant::now();

        let expired = match self.entries.get(&entry_key) {
            Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.value.clone())),
            Some(_) => true,
            None => false,
        };
        if expired {
            self.entries
                .remove_if(&entry_key, |_, entry| entry.is_expired(now));
        }
        Ok(None)
    }

    async fn set(
        &self,
        key: &str,
        value: Value,
        namespace: &str,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        let expires_at = ttl.map(|ttl| Instant::now() + ttl);
        self.entries
            .insert(Self::entry_key(key, namespace), Entry { value, expires_at });
        Ok(())
    }

    async fn delete(&self, key: &str, namespace: &str) -> Result<bool, CacheError> {
        Ok(self
            .entries
            .remove(&Self::entry_key(key, namespace))
            .is_some())
    }
}

/// Creates the cache backend named by the configuration. Expired entries are swept every
/// `purge_every` seconds when called inside a tokio runtime.
pub fn from_config(config: &CacheConfig) -> Arc<dyn Cache> {
    if config.kind != "memory" {
        warn!(
            "Cache type '{}' is not supported, falling back to memory",
            config.kind
        );
    }
    let cache = Arc::new(MemoryCache::new());
    if config.purge_every == 0 {
        warn!("Cache purge is disabled, expired entries are only dropped when read");
    } else if tokio::runtime::Handle::try_current().is_ok() {
        cache.spawn_purge(Duration::from_secs(config.purge_every));
    }
    cache
}
