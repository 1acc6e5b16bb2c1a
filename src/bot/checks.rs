//! Command checks run before every invocation.

use poise::serenity_prelude as serenity;

use crate::bot::Context;
use crate::bot::Data;
use crate::bot::Error;
use crate::cooldown::Cooldown;
use crate::cooldown::CooldownError;
use crate::cooldown::InvocationContext;

/// Snapshot of who invoked a command and where, as the cooldown engine sees it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invocation {
    pub user_id: u64,
    pub guild_id: Option<u64>,
    pub channel_id: u64,
    pub category_id: Option<u64>,
    pub role_ids: Vec<u64>,
    /// Role ids with their position in the guild, when the guild is cached.
    pub role_positions: Vec<(u64, u16)>,
}

impl Invocation {
    pub async fn from_context(ctx: Context<'_>) -> Self {
        let role_ids: Vec<u64> = ctx
            .author_member()
            .await
            .map(|member| member.roles.iter().map(|role| role.get()).collect())
            .unwrap_or_default();

        let (category_id, role_positions) = match ctx.guild() {
            Some(guild) => {
                let category = guild
                    .channels
                    .get(&ctx.channel_id())
                    .and_then(|channel| channel.parent_id)
                    .map(|parent| parent.get());
                let positions = role_ids
                    .iter()
                    .filter_map(|id| {
                        guild
                            .roles
                            .get(&serenity::RoleId::new(*id))
                            .map(|role| (*id, role.position))
                    })
                    .collect();
                (category, positions)
            }
            None => (None, Vec::new()),
        };

        Self {
            user_id: ctx.author().id.get(),
            guild_id: ctx.guild_id().map(|id| id.get()),
            channel_id: ctx.channel_id().get(),
            category_id,
            role_ids,
            role_positions,
        }
    }
}

impl InvocationContext for Invocation {
    fn user_id(&self) -> u64 {
        self.user_id
    }

    fn guild_id(&self) -> Option<u64> {
        self.guild_id
    }

    fn channel_id(&self) -> u64 {
        self.channel_id
    }

    fn category_id(&self) -> Option<u64> {
        self.category_id
    }

    fn role_ids(&self) -> &[u64] {
        &self.role_ids
    }

    fn top_role_id(&self) -> u64 {
        if self.role_positions.is_empty() {
            return self.role_ids.iter().copied().max().unwrap_or(0);
        }
        self.role_positions
            .iter()
            .max_by_key(|(id, position)| (*position, *id))
            .map(|(id, _)| *id)
            .unwrap_or(0)
    }
}

/// Global command check applying the cooldown registered for the invoked command.
pub async fn cooldown_check(ctx: Context<'_>) -> Result<bool, Error> {
    let Some(cooldown) = ctx
        .data()
        .command_cooldowns
        .get(&ctx.command().identifying_name)
    else {
        return Ok(true);
    };
    enforce_cooldown(ctx, cooldown).await?;
    Ok(true)
}

/// Records the invocation against `cooldown`. A denial is returned as the bare
/// [`CooldownExceeded`](crate::cooldown::CooldownExceeded) so error handlers can downcast it.
pub async fn enforce_cooldown(
    ctx: Context<'_>,
    cooldown: &Cooldown<Data, Invocation>,
) -> Result<(), Error> {
    let invocation = Invocation::from_context(ctx).await;
    let data = ctx.data();
    data.cooldowns
        .enforce(cooldown, data, &invocation)
        .await
        .map_err(|e| match e {
            CooldownError::Exceeded(exceeded) => Box::new(exceeded) as Error,
            other => Box::new(other) as Error,
        })
}
