//! Bucket kinds and bucket key derivation.

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

/// Which contextual identifier scopes a cooldown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BucketType {
    /// The base key as is.
    #[default]
    Default,
    User,
    /// User within a guild.
    Member,
    Guild,
    Channel,
    Category,
    /// Highest role of the invoking member.
    Role,
}

impl BucketType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::User => "user",
            Self::Member => "member",
            Self::Guild => "guild",
            Self::Channel => "channel",
            Self::Category => "category",
            Self::Role => "role",
        }
    }
}

impl fmt::Display for BucketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the cooldown engine needs to know about an invocation.
pub trait InvocationContext: Send + Sync {
    fn user_id(&self) -> u64;

    fn guild_id(&self) -> Option<u64>;

    fn channel_id(&self) -> u64;

    fn category_id(&self) -> Option<u64> {
        None
    }

    fn role_ids(&self) -> &[u64] {
        &[]
    }

    /// Highest role of the invoking member, `0` when it has none.
    fn top_role_id(&self) -> u64 {
        self.role_ids().iter().copied().max().unwrap_or(0)
    }
}

/// Derives the cache key of the bucket an invocation falls into.
pub fn bucket_key<C: InvocationContext + ?Sized>(ctx: &C, base: &str, bucket: BucketType) -> String {
    let user = || format!("{base}:user:{}", ctx.user_id());
    let channel = || format!("{base}:channel:{}", ctx.channel_id());

    match bucket {
        BucketType::Default => base.to_string(),
        BucketType::User => user(),
        BucketType::Member => match ctx.guild_id() {
            Some(guild) => format!("{base}:member:{guild}:{}", ctx.user_id()),
            None => user(),
        },
        BucketType::Guild => match ctx.guild_id() {
            Some(guild) => format!("{base}:guild:{guild}"),
            None => base.to_string(),
        },
        BucketType::Channel => channel(),
        BucketType::Category => match ctx.category_id() {
            Some(category) => format!("{base}:category:{category}"),
            None => channel(),
        },
        BucketType::Role => match ctx.guild_id() {
            Some(_) => format!("{base}:role:{}", ctx.top_role_id()),
            None => user(),
        },
    }
}
