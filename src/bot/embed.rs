//! Embeds carrying the bot's branding.

use std::sync::OnceLock;

use chrono::DateTime;
use chrono::FixedOffset;
use chrono::Utc;
use log::warn;
use poise::serenity_prelude as serenity;

static STYLE: OnceLock<EmbedStyle> = OnceLock::new();

/// Footer of branded embeds.
#[derive(Debug, Clone, PartialEq)]
pub struct FooterStyle {
    pub values: Vec<String>,
    /// Append the current time to the footer.
    pub time: bool,
    /// Label of the zone shown after the time.
    pub tz: String,
    pub offset: FixedOffset,
    pub separator: String,
}

impl FooterStyle {
    pub fn footer_text(&self, now: DateTime<Utc>) -> String {
        let mut values = self.values.clone();
        if self.time {
            let local = now.with_timezone(&self.offset);
            values.push(
                local
                    .format(&format!("%d %B %Y at %H:%M ({})", self.tz))
                    .to_string(),
            );
        }
        values.join(&format!(" {} ", self.separator))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmbedStyle {
    pub footer: Option<FooterStyle>,
    pub color: Option<u32>,
    pub author: Option<String>,
    pub author_url: Option<String>,
}

impl EmbedStyle {
    /// Applies the style to `embed`. Setting a colour afterwards overrides the branded one.
    pub fn apply(&self, mut embed: serenity::CreateEmbed) -> serenity::CreateEmbed {
        if let Some(footer) = &self.footer {
            embed = embed.footer(serenity::CreateEmbedFooter::new(
                footer.footer_text(Utc::now()),
            ));
        }
        if let Some(author) = &self.author {
            let mut author = serenity::CreateEmbedAuthor::new(author);
            if let Some(url) = &self.author_url {
                author = author.icon_url(url);
            }
            embed = embed.author(author);
        }
        if let Some(color) = self.color {
            embed = embed.colour(color);
        }
        embed
    }
}

/// Installs the process-wide style. Only the first call takes effect.
pub fn install_style(style: EmbedStyle) -> bool {
    if STYLE.set(style).is_err() {
        warn!("Embed style already installed, ignoring");
        return false;
    }
    true
}

pub fn style() -> Option<&'static EmbedStyle> {
    STYLE.get()
}

/// A new embed with the installed style, or a plain one.
pub fn embed() -> serenity::CreateEmbed {
    let embed = serenity::CreateEmbed::new();
    match style() {
        Some(style) => style.apply(embed),
        None => embed,
    }
}

/// Parses `UTC`, `GMT` or a `+HH:MM` / `-HH:MM` offset.
pub fn parse_offset(tz: &str) -> Option<FixedOffset> {
    let tz = tz.trim();
    if tz.eq_ignore_ascii_case("utc") || tz.eq_ignore_ascii_case("gmt") {
        return FixedOffset::east_opt(0);
    }
    let (sign, rest) = match tz.as_bytes().first()? {
        b'+' => (1, &tz[1..]),
        b'-' => (-1, &tz[1..]),
        _ => return None,
    };
    let (hours, minutes) = rest.split_once(':').unwrap_or((rest, "0"));
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if hours > 14 || minutes >= 60 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// Parses a colour given as an integer or a hex string with an optional `#`.
pub fn parse_color(value: &serde_json::Value) -> Option<u32> {
    match value {
        serde_json::Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        serde_json::Value::String(s) => u32::from_str_radix(s.trim_start_matches('#'), 16).ok(),
        _ => None,
    }
}
