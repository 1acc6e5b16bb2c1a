//! Rate-limit decisions over timestamps stored in the cache.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use log::debug;
use tokio::sync::Mutex;

use crate::cache::Cache;
use crate::cache::CacheExt;
use crate::cooldown::BucketType;
use crate::cooldown::Cooldown;
use crate::cooldown::CooldownError;
use crate::cooldown::CooldownExceeded;
use crate::cooldown::ResolvedCooldown;
use crate::cooldown::bucket::InvocationContext;
use crate::cooldown::bucket::bucket_key;
use crate::cooldown::clock::Clock;
use crate::cooldown::clock::SystemClock;

/// Cache namespace holding the timestamp sequences.
pub const NAMESPACE: &str = "cooldown";

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Allowed,
    Denied { retry_after: f64, bucket: BucketType },
}

impl Outcome {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

pub struct CooldownEngine {
    cache: Arc<dyn Cache>,
    clock: Arc<dyn Clock>,
    /// One lock per bucket key currently in use; the read-prune-append-write
    /// sequence of a key runs under it.
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl CooldownEngine {
    pub fn new(cache: Arc<dyn Cache>) -> Self {
        Self::with_clock(cache, Arc::new(SystemClock))
    }

    pub fn with_clock(cache: Arc<dyn Cache>, clock: Arc<dyn Clock>) -> Self {
        Self {
            cache,
            clock,
            locks: DashMap::new(),
        }
    }

    /// Resolves the settings, then checks and records the invocation in its bucket.
    ///
    /// Nothing is recorded when a setting fails to resolve.
    pub async fn check_and_record<B, C>(
        &self,
        cooldown: &Cooldown<B, C>,
        bot: &B,
        ctx: &C,
    ) -> Result<Outcome, CooldownError>
    where
        C: InvocationContext,
    {
        let settings = cooldown.resolve(bot, ctx).await?;
        let key = bucket_key(ctx, &settings.key, settings.bucket);

        let lock = self
            .locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let outcome = {
            let _guard = lock.lock().await;
            self.record(&key, &settings).await
        };
        drop(lock);
        self.locks
            .remove_if(&key, |_, lock| Arc::strong_count(lock) == 1);

        outcome
    }

    /// Like [`Self::check_and_record`], but a denial is returned as [`CooldownError::Exceeded`].
    pub async fn enforce<B, C>(
        &self,
        cooldown: &Cooldown<B, C>,
        bot: &B,
        ctx: &C,
    ) -> Result<(), CooldownError>
    where
        C: InvocationContext,
    {
        match self.check_and_record(cooldown, bot, ctx).await? {
            Outcome::Allowed => Ok(()),
            Outcome::Denied {
                retry_after,
                bucket,
            } => Err(CooldownExceeded {
                retry_after,
                bucket,
            }
            .into()),
        }
    }

    async fn record(&self, key: &str, settings: &ResolvedCooldown) -> Result<Outcome, CooldownError> {
        let now = self.clock.now();
        let per = f64::from(settings.per);
        let limit = settings.limit as usize;

        let stored: Vec<f64> = self.cache.get_as(key, NAMESPACE).await?.unwrap_or_default();
        let mut stamps: Vec<f64> = stored.into_iter().filter(|t| *t > now - per).collect();
        if stamps.len() > limit {
            stamps.drain(..stamps.len() - limit);
        }

        let mut effective_limit = limit;
        if stamps.len() < limit || settings.strong {
            stamps.push(now);
            self.cache
                .set_as(
                    key,
                    &stamps,
                    NAMESPACE,
                    Some(Duration::from_secs(u64::from(settings.per))),
                )
                .await?;
            // The invocation just recorded does not count against itself.
            effective_limit += 1;
        }

        if stamps.len() >= effective_limit {
            let earliest = stamps.iter().copied().fold(f64::INFINITY, f64::min);
            let retry_after = earliest - now + per;
            debug!(
                "Cooldown hit for {} ({} bucket), retry after {:.2}s",
                key, settings.bucket, retry_after
            );
            return Ok(Outcome::Denied {
                retry_after,
                bucket: settings.bucket,
            });
        }

        Ok(Outcome::Allowed)
    }

    /// Number of bucket keys with a lock currently held or awaited.
    pub fn active_keys(&self) -> usize {
        self.locks.len()
    }
}

#[cfg(test)]
mod tests {
    use futures::FutureExt;
    use serde_json::json;

    use super::*;
    use crate::cache::CacheError;
    use crate::cache::MockCache;
    use crate::cooldown::ManualClock;
    use crate::cooldown::Reactive;

    struct Ctx;

    impl InvocationContext for Ctx {
        fn user_id(&self) -> u64 {
            1
        }

        fn guild_id(&self) -> Option<u64> {
            None
        }

        fn channel_id(&self) -> u64 {
            2
        }
    }

    fn cooldown() -> Cooldown<(), Ctx> {
        Cooldown::builder()
            .key("k")
            .limit(1u32)
            .per(5u32)
            .bucket(BucketType::User)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_cache_read_failure_propagates() {
        let mut cache = MockCache::new();
        cache
            .expect_get()
            .returning(|_, _| Err(CacheError::Backend("down".to_string())));
        cache.expect_set().times(0);

        let engine = CooldownEngine::with_clock(Arc::new(cache), Arc::new(ManualClock::new(0.0)));
        let result = engine.check_and_record(&cooldown(), &(), &Ctx).await;

        assert!(matches!(result, Err(CooldownError::Cache(_))));
        assert_eq!(engine.active_keys(), 0);
    }

    #[tokio::test]
    async fn test_resolve_failure_records_nothing() {
        let mut cache = MockCache::new();
        cache.expect_get().times(0);
        cache.expect_set().times(0);

        let failing: Cooldown<(), Ctx> = Cooldown::builder()
            .key(Reactive::computed(|_: &(), _: &Ctx| {
                async { Err(anyhow::anyhow!("no key")) }.boxed()
            }))
            .limit(1u32)
            .per(5u32)
            .build()
            .unwrap();

        let engine = CooldownEngine::with_clock(Arc::new(cache), Arc::new(ManualClock::new(0.0)));
        let result = engine.check_and_record(&failing, &(), &Ctx).await;

        assert!(matches!(
            result,
            Err(CooldownError::Resolve { setting: "key", .. })
        ));
    }

    #[tokio::test]
    async fn test_record_is_written_with_window_ttl() {
        let mut cache = MockCache::new();
        cache
            .expect_get()
            .withf(|key, namespace| key.to_string() == "k:user:1" && namespace.to_string() == NAMESPACE)
            .returning(|_, _| Ok(None));
        cache
            .expect_set()
            .withf(|key, value, namespace, ttl| {
                key.to_string() == "k:user:1"
                    && *value == json!([10.0])
                    && namespace.to_string() == NAMESPACE
                    && *ttl == Some(Duration::from_secs(5))
            })
            .times(1)
            .returning(|_, _, _, _| Ok(()));

        let engine = CooldownEngine::with_clock(Arc::new(cache), Arc::new(ManualClock::new(10.0)));
        let outcome = engine.check_and_record(&cooldown(), &(), &Ctx).await.unwrap();

        assert_eq!(outcome, Outcome::Allowed);
    }
}
