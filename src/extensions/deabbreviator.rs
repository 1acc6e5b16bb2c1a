//! Expands chat abbreviations.

use std::sync::LazyLock;
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use minijinja::context;
use poise::serenity_prelude as serenity;
use regex::Captures;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use serde_json::json;

use crate::bot::Context;
use crate::bot::Data;
use crate::bot::Error;
use crate::bot::checks::Invocation;
use crate::bot::translations;
use crate::cache::Cache;
use crate::cache::CacheError;
use crate::cache::CacheExt;
use crate::cooldown::BucketType;
use crate::cooldown::Cooldown;
use crate::cooldown::CooldownError;
use crate::extension::ExtensionModule;
use crate::extension::Hook;
use crate::extension::HookArgs;
use crate::extension::HookParam;
use crate::extension::Schema;
use crate::i18n::render;

pub const NAMESPACE: &str = "deabbreviator";
const CACHE_TTL: Duration = Duration::from_secs(60 * 60);

pub const ABBREVIATIONS: &[(&str, &str)] = &[
    ("ngl", "not gonna lie"),
    ("nvm", "nevermind"),
    ("idk", "I don't know"),
    ("brb", "be right back"),
    ("btw", "by the way"),
    ("ty", "thank you"),
    ("thy", "thank you"),
    ("tx", "thanks"),
    ("thx", "thanks"),
    ("yw", "you're welcome"),
    ("asap", "as soon as possible"),
    ("fyi", "for your information"),
    ("np", "no problem"),
    ("omw", "on my way"),
    ("lmk", "let me know"),
    ("afaik", "as far as I know"),
    ("nafaik", "not as far as I know"),
    ("b4", "before"),
    ("bc", "because"),
    ("td", "today"),
    ("tmr", "tomorrow"),
    ("tmrw", "tomorrow"),
    ("tmoro", "tomorrow"),
    ("yd", "yesterday"),
    ("msg", "message"),
    ("abt", "about"),
    ("dm", "direct message"),
    ("pm", "private message"),
    ("irl", "in real life"),
    ("imo", "in my opinion"),
    ("smh", "shaking my head"),
    ("sm", "so much"),
    ("lol", "laughing out loud"),
    ("rofl", "rolling on the floor laughing"),
    ("grl", "girl"),
    ("ur", "you're"),
    ("qt", "cutie"),
    ("fr", "for real"),
    ("gf", "girlfriend"),
    ("bf", "boyfriend"),
    ("rn", "right now"),
    ("l8r", "later"),
    ("wtf", "what the f***"),
    ("omg", "oh my god"),
    ("ily", "I love you"),
    ("ily2", "I love you too"),
    ("ilym", "I love you more"),
    ("ilyt", "I love you too"),
    ("afk", "away from keyboard"),
    ("bbl", "be back later"),
    ("bbs", "be back soon"),
    ("g2g", "got to go"),
    ("gtg", "got to go"),
    ("dms", "direct messages"),
    ("pls", "please"),
    ("u", "you"),
    ("bst", "bestie"),
    ("gae", "good at everything"),
    ("dw", "don't worry"),
    ("dwab", "don't worry about it"),
    ("fs", "for sure"),
    ("stfu", "shut the f*** up"),
    ("ong", "oh my god"),
    ("eg", "example"),
    ("aka", "also known as"),
    ("tldr", "too long didn't read"),
    ("tmi", "too much information"),
    ("ttyl", "talk to you later"),
    ("tysm", "thank you so much"),
    ("wbu", "what about you"),
    ("wfh", "work from home"),
    ("wym", "what do you mean"),
    ("wyd", "what you doing"),
    ("wya", "where you at"),
    ("u2", "you too"),
    ("wb", "welcome back"),
    ("gn", "good night"),
    ("gm", "good morning"),
    ("gd", "good"),
    ("gj", "good job"),
    ("gg", "good game"),
    ("gl", "good luck"),
    ("ilysm", "I love you so much"),
    ("k", "okay"),
    ("kk", "okay"),
    ("ok", "okay"),
    ("pfp", "profile picture"),
    ("fu", "f*** you"),
    ("fml", "f*** my life"),
    ("ffs", "for f***'s sake"),
    ("fgs", "for god's sake"),
    ("smth", "something"),
    ("idw", "it doesn't work"),
    ("idc", "I don't care"),
    ("nbd", "no big deal"),
    ("nfs", "not for sale"),
    ("lgtm", "looks good to me"),
    ("lmao", "laughing my a** off"),
    ("l8", "late"),
    ("sys", "see you soon"),
    ("sry", "sorry"),
    ("ss", "screenshot"),
    ("bff", "best friend forever"),
    ("sya", "see you again"),
    ("sup", "what's up"),
    ("bro", "brother"),
];

/// Longer abbreviations first so that `ilysm` wins over `ily`.
static PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    let mut words: Vec<String> = ABBREVIATIONS
        .iter()
        .map(|(word, _)| regex::escape(word))
        .collect();
    words.sort_by(|a, b| b.len().cmp(&a.len()));
    Regex::new(&format!(r"(?i)\b({})\b", words.join("|"))).expect("abbreviation pattern is valid")
});

fn lookup(word: &str) -> Option<&'static str> {
    let lower = word.to_lowercase();
    ABBREVIATIONS
        .iter()
        .find(|(abbreviation, _)| *abbreviation == lower)
        .map(|(_, expansion)| *expansion)
}

fn is_upper(word: &str) -> bool {
    word.chars().any(char::is_uppercase) && !word.chars().any(char::is_lowercase)
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Expands every abbreviation in `text`. All-caps words expand to all caps, a leading
/// capital capitalizes the expansion.
pub fn expand(text: &str) -> String {
    PATTERN
        .replace_all(text, |caps: &Captures<'_>| {
            let word = &caps[0];
            let Some(expansion) = lookup(word) else {
                return word.to_string();
            };
            if is_upper(word) {
                expansion.to_uppercase()
            } else if word.chars().next().is_some_and(char::is_uppercase) {
                capitalize(expansion)
            } else {
                expansion.to_string()
            }
        })
        .into_owned()
}

/// [`expand`] with results kept in the cache for an hour.
pub async fn expand_cached(cache: &dyn Cache, text: &str) -> Result<String, CacheError> {
    if let Some(expanded) = cache.get_as::<String>(text, NAMESPACE).await? {
        return Ok(expanded);
    }
    let expanded = expand(text);
    cache
        .set_as(text, &expanded, NAMESPACE, Some(CACHE_TTL))
        .await?;
    Ok(expanded)
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
#[allow(dead_code)]
pub struct DeabbreviatorConfig {
    pub enabled: bool,
}

pub struct Deabbreviator;

impl ExtensionModule for Deabbreviator {
    fn name(&self) -> &'static str {
        "deabbreviator"
    }

    fn default_config(&self) -> Option<Value> {
        Some(json!({ "enabled": true }))
    }

    fn schema(&self) -> Option<Schema> {
        Some(Schema::of::<DeabbreviatorConfig>())
    }

    fn hooks(&self) -> Vec<Hook> {
        vec![Hook::setup(&[HookParam::Bot], setup)]
    }
}

fn user_cooldown(key: &str) -> Result<Cooldown<Data, Invocation>, CooldownError> {
    Cooldown::builder()
        .key(key)
        .limit(1u32)
        .per(5u32)
        .bucket(BucketType::User)
        .build()
}

fn setup(mut args: HookArgs<'_>) -> BoxFuture<'_, anyhow::Result<()>> {
    async move {
        let setup = args.bot_setup()?;
        setup
            .add_cog(|| vec![deabbreviate(), deabbreviate_message()])
            .add_cooldown("deabbreviate", user_cooldown("deabbreviate")?)
            .add_cooldown("deabbreviate_message", user_cooldown("deabbreviate_message")?);
        Ok(())
    }
    .boxed()
}

/// Expand the abbreviations in a text
#[poise::command(slash_command)]
pub async fn deabbreviate(
    ctx: Context<'_>,
    #[description = "The text to expand"] text: String,
) -> Result<(), Error> {
    let expanded = expand_cached(ctx.data().cache.as_ref(), &text).await?;
    if expanded == text {
        let none = translations(ctx)
            .text("no_abbreviations")
            .unwrap_or("No abbreviations found.")
            .to_string();
        ctx.say(none).await?;
        return Ok(());
    }
    ctx.say(expanded).await?;
    Ok(())
}

#[poise::command(context_menu_command = "Deabbreviate message")]
pub async fn deabbreviate_message(
    ctx: Context<'_>,
    message: serenity::Message,
) -> Result<(), Error> {
    let expanded = expand_cached(ctx.data().cache.as_ref(), &message.content).await?;
    let content = {
        let strings = translations(ctx);
        if expanded == message.content {
            strings
                .text("no_abbreviations")
                .unwrap_or("No abbreviations found.")
                .to_string()
        } else {
            let template = strings
                .text("success")
                .unwrap_or("{{ user }} said: {{ message }}\n-# {{ message_link }}");
            render(
                template,
                context! {
                    message => expanded,
                    user => message.author.display_name(),
                    message_link => message.link(),
                },
            )?
        }
    };
    ctx.say(content).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;

    #[test]
    fn test_all_keys() {
        for (key, value) in ABBREVIATIONS {
            assert_eq!(expand(key), *value, "{key}");
            assert_eq!(expand(&key.to_uppercase()), value.to_uppercase(), "{key}");
            let capitalized = capitalize(key);
            if capitalized != key.to_uppercase() {
                assert_eq!(expand(&capitalized), capitalize(value), "{key}");
            }
        }
    }

    #[test]
    fn test_basic_abbreviations() {
        assert_eq!(expand("btw"), "by the way");
        assert_eq!(expand("asap"), "as soon as possible");
        assert_eq!(expand("fyi"), "for your information");
    }

    #[test]
    fn test_case_sensitivity() {
        assert_eq!(expand("BTW"), "BY THE WAY");
        assert_eq!(expand("Btw"), "By the way");
        assert_eq!(expand("bTw"), "by the way");
    }

    #[test]
    fn test_punctuation() {
        assert_eq!(expand("Hello, btw!"), "Hello, by the way!");
        assert_eq!(expand("(btw)"), "(by the way)");
        assert_eq!(expand("btw..."), "by the way...");
        assert_eq!(expand("...btw"), "...by the way");
    }

    #[test]
    fn test_multiple_abbreviations() {
        assert_eq!(
            expand("btw idk what happened"),
            "by the way I don't know what happened"
        );
        assert_eq!(
            expand("fyi asap!"),
            "for your information as soon as possible!"
        );
    }

    #[test]
    fn test_mixed_text() {
        assert_eq!(
            expand("Hey there! btw, I'll be late idk maybe 30min?"),
            "Hey there! by the way, I'll be late I don't know maybe 30min?"
        );
    }

    #[test]
    fn test_special_characters() {
        assert_eq!(expand("btw → idk"), "by the way → I don't know");
        assert_eq!(expand("¿btw?"), "¿by the way?");
        assert_eq!(expand("btw: ümlaut"), "by the way: ümlaut");
    }

    #[test]
    fn test_edge_cases() {
        assert_eq!(expand(""), "");
        assert_eq!(expand(" btw "), " by the way ");
        assert_eq!(expand("btw.btw"), "by the way.by the way");
        let original = "This is a normal sentence without abbreviations.";
        assert_eq!(expand(original), original);
    }

    #[tokio::test]
    async fn test_expansion_is_cached() {
        let cache = MemoryCache::new();
        assert_eq!(expand_cached(&cache, "brb").await.unwrap(), "be right back");
        let cached: Option<String> = cache.get_as("brb", NAMESPACE).await.unwrap();
        assert_eq!(cached.as_deref(), Some("be right back"));
    }
}
