use crate::i18n::I18nError;

/// Failures of a command that are shown to the user as they are.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum BotError {
    #[error("Invalid argument for {parameter}: {reason}")]
    InvalidCommandArgument { parameter: String, reason: String },

    #[error("This command can only be used in a server.")]
    GuildOnlyCommand,

    #[error("Translation error: {0}")]
    Translation(#[from] I18nError),
}
