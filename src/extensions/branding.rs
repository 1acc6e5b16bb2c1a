//! Branded embeds and a rotating bot status.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;
use log::info;
use log::warn;
use poise::serenity_prelude as serenity;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::Deserialize;
use serde_json::Value;
use serde_json::json;

use crate::bot::Data;
use crate::bot::Listener;
use crate::bot::embed::EmbedStyle;
use crate::bot::embed::FooterStyle;
use crate::bot::embed::install_style;
use crate::bot::embed::parse_color;
use crate::bot::embed::parse_offset;
use crate::extension::ExtensionModule;
use crate::extension::Hook;
use crate::extension::HookArgs;
use crate::extension::HookParam;
use crate::extension::Schema;
use crate::task::Looper;

const DEFAULT_EVERY: u64 = 60 * 5;

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(value) => vec![value],
            Self::Many(values) => values,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FooterConfig {
    #[serde(default)]
    pub value: Option<OneOrMany>,
    #[serde(default)]
    pub time: bool,
    #[serde(default)]
    pub tz: Option<String>,
    #[serde(default)]
    pub separator: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EmbedConfig {
    #[serde(default)]
    pub footer: Option<FooterConfig>,
    /// An integer or a hex string.
    #[serde(default)]
    pub color: Option<Value>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub author_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StatusConfig {
    #[serde(default)]
    pub playing: Option<OneOrMany>,
    #[serde(default)]
    pub watching: Option<OneOrMany>,
    #[serde(default)]
    pub listening: Option<OneOrMany>,
    #[serde(default)]
    pub competing: Option<OneOrMany>,
    #[serde(default)]
    pub every: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BrandingConfig {
    pub enabled: bool,
    #[serde(default)]
    pub embed: Option<EmbedConfig>,
    #[serde(default)]
    pub status: Option<StatusConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityKind {
    Playing,
    Watching,
    Listening,
    Competing,
}

impl ActivityKind {
    pub fn activity(self, text: &str) -> serenity::ActivityData {
        match self {
            Self::Playing => serenity::ActivityData::playing(text),
            Self::Watching => serenity::ActivityData::watching(text),
            Self::Listening => serenity::ActivityData::listening(text),
            Self::Competing => serenity::ActivityData::competing(text),
        }
    }
}

impl StatusConfig {
    /// Configured activity kinds with their texts, in a fixed order.
    pub fn activities(&self) -> Vec<(ActivityKind, Vec<String>)> {
        [
            (ActivityKind::Playing, &self.playing),
            (ActivityKind::Watching, &self.watching),
            (ActivityKind::Listening, &self.listening),
            (ActivityKind::Competing, &self.competing),
        ]
        .into_iter()
        .filter_map(|(kind, texts)| {
            let texts = texts.clone()?.into_vec();
            (!texts.is_empty()).then_some((kind, texts))
        })
        .collect()
    }

    pub fn every(&self) -> Duration {
        Duration::from_secs(self.every.unwrap_or(DEFAULT_EVERY))
    }
}

fn check(config: &BrandingConfig) -> Result<(), String> {
    if let Some(status) = &config.status {
        if status.activities().is_empty() {
            return Err("status needs at least one of playing, watching, listening, competing".to_string());
        }
        if status.every == Some(0) {
            return Err("status.every must be positive".to_string());
        }
    }
    if let Some(embed) = &config.embed {
        embed_style(embed)?;
    }
    Ok(())
}

/// The embed style described by `config`.
pub fn embed_style(config: &EmbedConfig) -> Result<EmbedStyle, String> {
    let footer = match &config.footer {
        Some(footer) => {
            let tz = footer.tz.clone().unwrap_or_else(|| "UTC".to_string());
            let offset = parse_offset(&tz).ok_or_else(|| format!("unknown time zone {tz}"))?;
            Some(FooterStyle {
                values: footer.value.clone().map(OneOrMany::into_vec).unwrap_or_default(),
                time: footer.time,
                tz,
                offset,
                separator: footer.separator.clone().unwrap_or_else(|| "|".to_string()),
            })
        }
        None => None,
    };
    let color = match &config.color {
        Some(value) => Some(parse_color(value).ok_or_else(|| format!("invalid color {value}"))?),
        None => None,
    };
    Ok(EmbedStyle {
        footer,
        color,
        author: config.author.clone(),
        author_url: config.author_url.clone(),
    })
}

/// A random kind, then a random text of that kind.
pub fn pick<'a, R: Rng + ?Sized>(
    activities: &'a [(ActivityKind, Vec<String>)],
    rng: &mut R,
) -> Option<(ActivityKind, &'a str)> {
    let (kind, texts) = activities.choose(rng)?;
    let text = texts.choose(rng)?;
    Some((*kind, text.as_str()))
}

pub struct Branding;

impl ExtensionModule for Branding {
    fn name(&self) -> &'static str {
        "branding"
    }

    fn default_config(&self) -> Option<Value> {
        Some(json!({
            "enabled": true,
            "status": {
                "watching": ["you", "/help"],
                "every": DEFAULT_EVERY,
            },
            "embed": {
                "footer": {
                    "value": ["footer"],
                    "time": true,
                    "tz": "UTC",
                    "separator": "|",
                },
                "color": 0x00FF00,
                "author": "Nice Bot",
                "author_url": "https://picsum.photos/512",
            },
        }))
    }

    fn schema(&self) -> Option<Schema> {
        Some(Schema::of_with::<BrandingConfig, _>(check))
    }

    fn hooks(&self) -> Vec<Hook> {
        vec![Hook::setup(&[HookParam::Bot, HookParam::Config], setup)]
    }

    fn patch(&self) -> Option<Hook> {
        Some(Hook::patch(patch))
    }
}

/// Installs the embed style before anything builds an embed.
fn patch(args: HookArgs<'_>) -> BoxFuture<'_, anyhow::Result<()>> {
    async move {
        let config: BrandingConfig = args.config()?.parse()?;
        if let Some(embed) = &config.embed {
            let style = embed_style(embed).map_err(anyhow::Error::msg)?;
            if install_style(style) {
                info!("Installed branded embed style");
            }
        }
        Ok(())
    }
    .boxed()
}

fn setup(mut args: HookArgs<'_>) -> BoxFuture<'_, anyhow::Result<()>> {
    async move {
        let config: BrandingConfig = args.config()?.parse()?;
        if config.embed.is_none() && config.status.is_none() {
            warn!(
                "Branding extension is enabled but no configuration is provided for embed or status. \
                 You can disable this extension or provide a configuration in the config.yaml file."
            );
        }
        if let Some(status) = config.status {
            args.bot_setup()?.add_listener(StatusRotation {
                activities: Arc::new(status.activities()),
                every: status.every(),
                started: AtomicBool::new(false),
            });
        }
        Ok(())
    }
    .boxed()
}

/// Starts the status loop on the first ready event.
struct StatusRotation {
    activities: Arc<Vec<(ActivityKind, Vec<String>)>>,
    every: Duration,
    started: AtomicBool,
}

#[async_trait]
impl Listener for StatusRotation {
    async fn on_event(
        &self,
        ctx: &serenity::Context,
        event: &serenity::FullEvent,
        _data: &Data,
    ) -> anyhow::Result<()> {
        if let serenity::FullEvent::Ready { .. } = event
            && !self.started.swap(true, Ordering::SeqCst)
        {
            Arc::new(StatusLoop {
                ctx: ctx.clone(),
                activities: self.activities.clone(),
                every: self.every,
            })
            .spawn();
        }
        Ok(())
    }
}

struct StatusLoop {
    ctx: serenity::Context,
    activities: Arc<Vec<(ActivityKind, Vec<String>)>>,
    every: Duration,
}

#[async_trait]
impl Looper for StatusLoop {
    fn name(&self) -> &str {
        "Status rotation"
    }

    fn interval(&self) -> Duration {
        self.every
    }

    async fn loop_func(&self) -> anyhow::Result<()> {
        let activity = {
            let mut rng = rand::thread_rng();
            pick(&self.activities, &mut rng).map(|(kind, text)| kind.activity(text))
        };
        if let Some(activity) = activity {
            self.ctx.set_activity(Some(activity));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::FixedOffset;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn parse(value: Value) -> BrandingConfig {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_default_config_builds_style() {
        let config = parse(Branding.default_config().unwrap());
        let style = embed_style(config.embed.as_ref().unwrap()).unwrap();
        assert_eq!(style.color, Some(0x00FF00));
        let footer = style.footer.unwrap();
        assert_eq!(footer.values, vec!["footer".to_string()]);
        assert_eq!(footer.offset, FixedOffset::east_opt(0).unwrap());
        assert_eq!(style.author.as_deref(), Some("Nice Bot"));
    }

    #[test]
    fn test_single_string_footer_and_hex_color() {
        let config = parse(json!({
            "enabled": true,
            "embed": { "footer": { "value": "Made with love" }, "color": "#ff8800" },
        }));
        let style = embed_style(config.embed.as_ref().unwrap()).unwrap();
        let footer = style.footer.unwrap();
        assert_eq!(footer.values, vec!["Made with love".to_string()]);
        assert_eq!(footer.separator, "|");
        assert_eq!(style.color, Some(0xFF8800));
    }

    #[test]
    fn test_schema_rules() {
        let schema = Branding.schema().unwrap();
        assert!(schema.validate(&json!({ "enabled": true, "status": { "every": 10 } })).is_err());
        assert!(
            schema
                .validate(&json!({ "enabled": true, "status": { "playing": "x", "every": 0 } }))
                .is_err()
        );
        assert!(
            schema
                .validate(&json!({ "enabled": true, "embed": { "footer": { "value": "x", "tz": "Mars/Base" } } }))
                .is_err()
        );
        assert!(
            schema
                .validate(&json!({ "enabled": true, "status": { "listening": ["music"] } }))
                .is_ok()
        );
    }

    #[test]
    fn test_pick_uses_configured_texts() {
        let status: StatusConfig = serde_json::from_value(json!({
            "watching": ["you"],
            "playing": "games",
        }))
        .unwrap();
        let activities = status.activities();
        assert_eq!(activities.len(), 2);
        assert_eq!(status.every(), Duration::from_secs(DEFAULT_EVERY));

        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let (kind, text) = pick(&activities, &mut rng).unwrap();
            match kind {
                ActivityKind::Watching => assert_eq!(text, "you"),
                ActivityKind::Playing => assert_eq!(text, "games"),
                other => panic!("unexpected kind {other:?}"),
            }
        }
        assert!(pick(&[], &mut rng).is_none());
    }
}
