//! Per-invocation access to command strings.

use log::debug;

use crate::bot::Context;
use crate::i18n::CommandStrings;
use crate::i18n::Locale;
use crate::i18n::View;
use crate::i18n::empty;

/// Locale of an invocation: the user's interaction locale, then the guild's preferred locale.
/// Locales outside the supported set degrade to the default.
pub fn invocation_locale(ctx: Context<'_>) -> Locale {
    let guild_locale = ctx.guild().map(|guild| guild.preferred_locale.clone());
    locale_from(ctx.locale(), guild_locale.as_deref())
}

pub fn locale_from(user: Option<&str>, guild: Option<&str>) -> Locale {
    [user, guild]
        .into_iter()
        .flatten()
        .find_map(|candidate| match candidate.parse::<Locale>() {
            Ok(locale) => Some(locale),
            Err(_) => {
                debug!("Unsupported locale {}, falling back", candidate);
                None
            }
        })
        .unwrap_or_default()
}

/// The `strings` of the invoked command, read in the invocation's locale.
pub fn translations<'a>(ctx: Context<'a>) -> View<'a> {
    let command = ctx.command();
    let node = command
        .custom_data
        .downcast_ref::<CommandStrings>()
        .map(|strings| strings.0.as_ref())
        .unwrap_or_else(|| empty());
    View::new(node, invocation_locale(ctx), Locale::default())
}
