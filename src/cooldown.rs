//! Sliding-window cooldowns with per-entity buckets and per-invocation settings.
//!
//! A [`Cooldown`] describes the settings; each may be a literal or computed from the bot
//! state and the invocation. The [`CooldownEngine`] resolves them, derives the bucket key and
//! keeps the recent invocation timestamps of every key in a [`Cache`](crate::cache::Cache).

pub mod bucket;
pub mod clock;
pub mod engine;
pub mod reactive;

use derive_builder::Builder;
use derive_builder::UninitializedFieldError;

pub use crate::cooldown::bucket::BucketType;
pub use crate::cooldown::bucket::InvocationContext;
pub use crate::cooldown::bucket::bucket_key;
pub use crate::cooldown::clock::Clock;
pub use crate::cooldown::clock::ManualClock;
pub use crate::cooldown::clock::SystemClock;
pub use crate::cooldown::engine::CooldownEngine;
pub use crate::cooldown::engine::Outcome;
pub use crate::cooldown::reactive::Reactive;

use crate::cache::CacheError;

/// The invocation is rate limited. Carries how long until the bucket frees up.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("You are on {bucket} cooldown")]
pub struct CooldownExceeded {
    pub retry_after: f64,
    pub bucket: BucketType,
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CooldownError {
    #[error("Invalid cooldown setting `{setting}`: {reason}")]
    InvalidSetting {
        setting: &'static str,
        reason: String,
    },

    #[error("Failed to resolve cooldown setting `{setting}`: {source}")]
    Resolve {
        setting: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Exceeded(#[from] CooldownExceeded),
}

impl From<UninitializedFieldError> for CooldownError {
    fn from(err: UninitializedFieldError) -> Self {
        Self::InvalidSetting {
            setting: err.field_name(),
            reason: "must be set".to_string(),
        }
    }
}

/// Cooldown settings for one guarded action.
///
/// `B` is the bot-wide state handed to computed settings, `C` the invocation context.
#[derive(Builder)]
#[builder(
    pattern = "owned",
    setter(into),
    build_fn(validate = "Self::validate", error = "CooldownError")
)]
pub struct Cooldown<B, C> {
    /// Base key, non-empty.
    key: Reactive<String, B, C>,
    /// Maximum invocations per window, positive.
    limit: Reactive<u32, B, C>,
    /// Window length in seconds, positive.
    per: Reactive<u32, B, C>,
    #[builder(default = "Reactive::Literal(BucketType::Default)")]
    bucket: Reactive<BucketType, B, C>,
    /// Record denied invocations too, which keeps pushing the window forward.
    #[builder(default = "Reactive::Literal(false)")]
    strong: Reactive<bool, B, C>,
}

/// Settings of a [`Cooldown`] after resolution for one invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedCooldown {
    pub key: String,
    pub limit: u32,
    pub per: u32,
    pub bucket: BucketType,
    pub strong: bool,
}

impl<B, C> Cooldown<B, C> {
    pub fn builder() -> CooldownBuilder<B, C> {
        CooldownBuilder::default()
    }

    /// Resolves every setting in order: key, limit, per, bucket, strong.
    pub async fn resolve(&self, bot: &B, ctx: &C) -> Result<ResolvedCooldown, CooldownError> {
        let key = resolve_setting("key", &self.key, bot, ctx).await?;
        let limit = resolve_setting("limit", &self.limit, bot, ctx).await?;
        let per = resolve_setting("per", &self.per, bot, ctx).await?;
        let bucket = resolve_setting("bucket", &self.bucket, bot, ctx).await?;
        let strong = resolve_setting("strong", &self.strong, bot, ctx).await?;

        let resolved = ResolvedCooldown {
            key,
            limit,
            per,
            bucket,
            strong,
        };
        resolved.validate()?;
        Ok(resolved)
    }
}

impl ResolvedCooldown {
    fn validate(&self) -> Result<(), CooldownError> {
        check_key(&self.key)?;
        check_positive("limit", self.limit)?;
        check_positive("per", self.per)
    }
}

impl<B, C> CooldownBuilder<B, C> {
    /// Literal settings are checked here so that a bad cooldown fails at setup time.
    fn validate(&self) -> Result<(), CooldownError> {
        if let Some(Reactive::Literal(key)) = &self.key {
            check_key(key)?;
        }
        if let Some(Reactive::Literal(limit)) = &self.limit {
            check_positive("limit", *limit)?;
        }
        if let Some(Reactive::Literal(per)) = &self.per {
            check_positive("per", *per)?;
        }
        Ok(())
    }
}

async fn resolve_setting<T: Clone, B, C>(
    setting: &'static str,
    value: &Reactive<T, B, C>,
    bot: &B,
    ctx: &C,
) -> Result<T, CooldownError> {
    value
        .resolve(bot, ctx)
        .await
        .map_err(|e| CooldownError::Resolve {
            setting,
            source: e.into(),
        })
}

fn check_key(key: &str) -> Result<(), CooldownError> {
    if key.is_empty() {
        return Err(CooldownError::InvalidSetting {
            setting: "key",
            reason: "must not be empty".to_string(),
        });
    }
    Ok(())
}

fn check_positive(setting: &'static str, value: u32) -> Result<(), CooldownError> {
    if value == 0 {
        return Err(CooldownError::InvalidSetting {
            setting,
            reason: "must be positive".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use futures::FutureExt;

    use super::*;

    struct Ctx;

    #[test]
    fn test_builder_rejects_zero_limit() {
        let result = Cooldown::<(), Ctx>::builder()
            .key("ping")
            .limit(0u32)
            .per(5u32)
            .build();
        assert!(matches!(
            result,
            Err(CooldownError::InvalidSetting { setting: "limit", .. })
        ));
    }

    #[test]
    fn test_builder_rejects_empty_key() {
        let result = Cooldown::<(), Ctx>::builder()
            .key("")
            .limit(1u32)
            .per(5u32)
            .build();
        assert!(matches!(
            result,
            Err(CooldownError::InvalidSetting { setting: "key", .. })
        ));
    }

    #[test]
    fn test_builder_requires_window() {
        let result = Cooldown::<(), Ctx>::builder().key("ping").limit(1u32).build();
        assert!(matches!(
            result,
            Err(CooldownError::InvalidSetting { setting: "per", .. })
        ));
    }

    #[tokio::test]
    async fn test_computed_zero_is_rejected_at_resolve() {
        let cooldown = Cooldown::<u32, Ctx>::builder()
            .key("ping")
            .limit(Reactive::computed(|limit: &u32, _: &Ctx| {
                futures::future::ready(Ok(*limit)).boxed()
            }))
            .per(5u32)
            .build()
            .unwrap();

        let result = cooldown.resolve(&0, &Ctx).await;
        assert!(matches!(
            result,
            Err(CooldownError::InvalidSetting { setting: "limit", .. })
        ));
        assert_eq!(cooldown.resolve(&3, &Ctx).await.unwrap().limit, 3);
    }

    #[tokio::test]
    async fn test_defaults() {
        let cooldown = Cooldown::<(), Ctx>::builder()
            .key("ping")
            .limit(2u32)
            .per(10u32)
            .build()
            .unwrap();
        let resolved = cooldown.resolve(&(), &Ctx).await.unwrap();
        assert_eq!(resolved.bucket, BucketType::Default);
        assert!(!resolved.strong);
    }

    #[test]
    fn test_exceeded_message() {
        let err = CooldownExceeded {
            retry_after: 3.0,
            bucket: BucketType::User,
        };
        assert_eq!(err.to_string(), "You are on user cooldown");
    }
}
