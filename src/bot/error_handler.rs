//! Error handling for Discord bot commands.

use log::debug;
use log::error;
use log::warn;
use poise::Command;
use poise::CreateReply;
use poise::FrameworkError;
use poise::serenity_prelude as serenity;
use uuid::Uuid;

use crate::bot::Context;
use crate::bot::Data;
use crate::bot::Error;
use crate::bot::embed::embed;
use crate::bot::error::BotError;
use crate::bot::translations::invocation_locale;
use crate::bot::translations::locale_from;
use crate::cooldown::CooldownError;
use crate::cooldown::CooldownExceeded;
use crate::error::AppError;
use crate::i18n::Locale;

/// Broad kind of a failure, used to pick a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The invocation hit a cooldown.
    Cooldown,
    /// A prefix command that does not exist was invoked.
    NotFound,
    /// Discord refused an action for lack of permissions.
    Forbidden,
    Generic,
}

/// Classifies an error by walking its source chain. Cooldowns carry their retry delay.
pub fn classify(error: &(dyn std::error::Error + Send + Sync + 'static)) -> (ErrorClass, Option<f64>) {
    let mut current: Option<&(dyn std::error::Error + 'static)> = Some(error);
    while let Some(err) = current {
        if let Some(exceeded) = err.downcast_ref::<CooldownExceeded>() {
            return (ErrorClass::Cooldown, Some(exceeded.retry_after));
        }
        if let Some(CooldownError::Exceeded(exceeded)) = err.downcast_ref::<CooldownError>() {
            return (ErrorClass::Cooldown, Some(exceeded.retry_after));
        }
        if let Some(serenity::Error::Http(http)) = err.downcast_ref::<serenity::Error>()
            && http.status_code().map(|status| status.as_u16()) == Some(403)
        {
            return (ErrorClass::Forbidden, None);
        }
        current = err.source();
    }
    (ErrorClass::Generic, None)
}

/// Everything a responder may use to word its reply.
#[derive(Debug)]
pub struct Failure<'a> {
    pub class: ErrorClass,
    pub locale: Locale,
    pub error: Option<&'a (dyn std::error::Error + Send + Sync)>,
    /// Qualified name of the failed command.
    pub command: Option<&'a str>,
    /// The word used to invoke a command that does not exist.
    pub invoked: Option<&'a str>,
    /// Names of the commands that can be invoked by prefix.
    pub command_names: Vec<&'a str>,
    pub retry_after: Option<f64>,
    /// Id under which an unexpected error was logged.
    pub reference: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorReply {
    pub content: String,
    pub ephemeral: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Reply(ErrorReply),
    /// Handled, nothing is sent.
    Silent,
    /// Not handled, ask the next responder.
    Pass,
}

/// Turns failures into replies. Registered by extensions through `BotSetup`.
pub trait ErrorResponder: Send + Sync {
    fn respond(&self, failure: &Failure<'_>) -> Response;
}

/// Asks every responder in order; the first that does not pass decides.
pub fn respond(responders: &[std::sync::Arc<dyn ErrorResponder>], failure: &Failure<'_>) -> Response {
    responders
        .iter()
        .map(|responder| responder.respond(failure))
        .find(|response| *response != Response::Pass)
        .unwrap_or(Response::Pass)
}

/// Names of the commands that can be invoked by prefix.
pub fn prefix_command_names<U, E>(commands: &[Command<U, E>]) -> Vec<&str> {
    commands
        .iter()
        .filter(|command| command.prefix_action.is_some() || !command.subcommands.is_empty())
        .map(|command| command.name.as_str())
        .collect()
}

/// Handles framework errors and sends appropriate responses to users.
pub struct ErrorHandler;

impl ErrorHandler {
    pub async fn handle(error: FrameworkError<'_, Data, Error>) {
        match error {
            FrameworkError::Command { error, ctx, .. } => {
                Self::on_command_failure(ctx, error.as_ref()).await;
            }
            FrameworkError::CommandCheckFailed {
                error: Some(error),
                ctx,
                ..
            } => {
                Self::on_command_failure(ctx, error.as_ref()).await;
            }
            FrameworkError::UnknownCommand {
                ctx,
                msg,
                msg_content,
                framework,
                ..
            } => {
                Self::on_unknown_command(ctx, msg, msg_content, framework).await;
            }
            FrameworkError::ArgumentParse { error, ctx, .. } => {
                let description = format!(
                    "**Command:** `/{}`\n**Issue:** {}\n\n> Use `/help {}` for usage information.",
                    ctx.command().name,
                    error,
                    ctx.command().name
                );
                Self::send_embed(ctx, "⚠️ Invalid Arguments", description).await;
            }
            error => {
                if let Err(e) = poise::builtins::on_error(error).await {
                    error!("Error while handling error: {}", e);
                }
            }
        }
    }

    async fn on_command_failure(ctx: Context<'_>, error: &(dyn std::error::Error + Send + Sync + 'static)) {
        let (class, retry_after) = classify(error);
        let reference = match class {
            ErrorClass::Generic if error.downcast_ref::<BotError>().is_none() => {
                error!(
                    "Unexpected error in command `{}`",
                    ctx.command().qualified_name
                );
                Some(AppError::log_with_ref(error))
            }
            ErrorClass::Forbidden => {
                warn!(
                    "Missing permissions in command `{}`: {}",
                    ctx.command().qualified_name,
                    error
                );
                None
            }
            _ => {
                debug!("Command `{}` failed: {}", ctx.command().qualified_name, error);
                None
            }
        };

        let failure = Failure {
            class,
            locale: invocation_locale(ctx),
            error: Some(error),
            command: Some(ctx.command().qualified_name.as_str()),
            invoked: None,
            command_names: Vec::new(),
            retry_after,
            reference,
        };

        match respond(&ctx.data().responders, &failure) {
            Response::Reply(reply) => {
                let result = ctx
                    .send(
                        CreateReply::default()
                            .content(reply.content)
                            .ephemeral(reply.ephemeral),
                    )
                    .await;
                if let Err(e) = result {
                    warn!("Failed to send error reply: {}", e);
                }
            }
            Response::Silent => {}
            Response::Pass => {
                let (title, description) = Self::describe(&failure);
                Self::send_embed(ctx, title, description).await;
            }
        }
    }

    async fn on_unknown_command(
        ctx: &serenity::Context,
        msg: &serenity::Message,
        msg_content: &str,
        framework: poise::FrameworkContext<'_, Data, Error>,
    ) {
        let Some(invoked) = msg_content.split_whitespace().next() else {
            return;
        };
        let guild_locale = msg
            .guild_id
            .and_then(|id| ctx.cache.guild(id).map(|guild| guild.preferred_locale.clone()));

        let failure = Failure {
            class: ErrorClass::NotFound,
            locale: locale_from(None, guild_locale.as_deref()),
            error: None,
            command: None,
            invoked: Some(invoked),
            command_names: prefix_command_names(&framework.options.commands),
            retry_after: None,
            reference: None,
        };

        match respond(&framework.user_data.responders, &failure) {
            Response::Reply(reply) => {
                if let Err(e) = msg.reply(ctx, reply.content).await {
                    warn!("Failed to send error reply: {}", e);
                }
            }
            Response::Silent | Response::Pass => {
                debug!("Unknown command `{}`", invoked);
            }
        }
    }

    /// Title and description used when no responder handled a failure.
    fn describe(failure: &Failure<'_>) -> (&'static str, String) {
        let command = failure.command.unwrap_or_default();
        match failure.class {
            ErrorClass::Cooldown => (
                "⏳ Slow Down",
                format!(
                    "**Command:** `{}`\n**Error:** Try again in {:.1} seconds.",
                    command,
                    failure.retry_after.unwrap_or_default()
                ),
            ),
            ErrorClass::Forbidden => (
                "❌ Missing Permissions",
                format!(
                    "**Command:** `{}`\n**Error:** I am missing permissions to do that.",
                    command
                ),
            ),
            ErrorClass::Generic | ErrorClass::NotFound => match failure.reference {
                Some(reference) => (
                    "❌ Internal Error",
                    format!(
                        "**Command:** `{}`\n**Error:** An unexpected error occurred. Please contact the bot developer.\n-# Reference ID: {}",
                        command, reference
                    ),
                ),
                None => (
                    "❌ Action Failed",
                    format!(
                        "**Command:** `{}`\n**Error:** {}",
                        command,
                        failure.error.map(ToString::to_string).unwrap_or_default()
                    ),
                ),
            },
        }
    }

    async fn send_embed(ctx: Context<'_>, title: &str, description: String) {
        let reply = CreateReply::default()
            .embed(embed().title(title).description(description))
            .ephemeral(true);
        if let Err(e) = ctx.send(reply).await {
            warn!("Failed to send error reply: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::cooldown::BucketType;

    fn failure(class: ErrorClass) -> Failure<'static> {
        Failure {
            class,
            locale: Locale::default(),
            error: None,
            command: Some("ping"),
            invoked: None,
            command_names: Vec::new(),
            retry_after: None,
            reference: None,
        }
    }

    struct Only(ErrorClass, &'static str);

    impl ErrorResponder for Only {
        fn respond(&self, failure: &Failure<'_>) -> Response {
            if failure.class != self.0 {
                return Response::Pass;
            }
            Response::Reply(ErrorReply {
                content: self.1.to_string(),
                ephemeral: true,
            })
        }
    }

    #[test]
    fn test_classify_cooldown() {
        let exceeded = CooldownExceeded {
            retry_after: 2.5,
            bucket: BucketType::User,
        };
        let boxed: Error = Box::new(exceeded.clone());
        assert_eq!(classify(boxed.as_ref()), (ErrorClass::Cooldown, Some(2.5)));

        let wrapped: Error = Box::new(CooldownError::Exceeded(exceeded));
        assert_eq!(classify(wrapped.as_ref()), (ErrorClass::Cooldown, Some(2.5)));
    }

    #[test]
    fn test_classify_generic() {
        let boxed: Error = Box::new(BotError::GuildOnlyCommand);
        assert_eq!(classify(boxed.as_ref()), (ErrorClass::Generic, None));
    }

    #[test]
    fn test_first_non_passing_responder_decides() {
        let responders: Vec<Arc<dyn ErrorResponder>> = vec![
            Arc::new(Only(ErrorClass::Cooldown, "slow down")),
            Arc::new(Only(ErrorClass::Generic, "oops")),
            Arc::new(Only(ErrorClass::Generic, "never")),
        ];
        assert_eq!(
            respond(&responders, &failure(ErrorClass::Generic)),
            Response::Reply(ErrorReply {
                content: "oops".to_string(),
                ephemeral: true,
            })
        );
        assert_eq!(respond(&responders, &failure(ErrorClass::Forbidden)), Response::Pass);
    }

    #[test]
    fn test_fallback_description_mentions_reference() {
        let reference = Uuid::new_v4();
        let failure = Failure {
            reference: Some(reference),
            ..failure(ErrorClass::Generic)
        };
        let (title, description) = ErrorHandler::describe(&failure);
        assert_eq!(title, "❌ Internal Error");
        assert!(description.contains(&reference.to_string()));
    }
}
