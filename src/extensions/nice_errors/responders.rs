use std::sync::Arc;

use log::warn;
use minijinja::context;

use crate::bot::error_handler::ErrorClass;
use crate::bot::error_handler::ErrorReply;
use crate::bot::error_handler::ErrorResponder;
use crate::bot::error_handler::Failure;
use crate::bot::error_handler::Response;
use crate::extension::ExtensionConfig;
use crate::i18n::Locale;
use crate::i18n::render;

/// Lowest similarity for a command to be suggested.
pub const SIMILARITY_CUTOFF: f64 = 0.6;

/// Closest of `candidates` to `word`, if any is similar enough.
pub fn most_similar<'c>(word: &str, candidates: &[&'c str]) -> Option<&'c str> {
    candidates
        .iter()
        .map(|candidate| (*candidate, strsim::normalized_damerau_levenshtein(word, candidate)))
        .filter(|(_, score)| *score >= SIMILARITY_CUTOFF)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(candidate, _)| candidate)
}

struct Strings {
    config: Arc<ExtensionConfig>,
}

impl Strings {
    /// Renders `key` in `locale`, or `fallback` when the translation is missing.
    fn render(&self, locale: Locale, key: &str, fallback: &str, ctx: minijinja::Value) -> String {
        let view = self.config.strings(locale);
        let template = match view.text(key) {
            Ok(text) => text,
            Err(e) => {
                warn!("Missing nice_errors string {}: {}", key, e);
                fallback
            }
        };
        match render(template, ctx) {
            Ok(text) => text,
            Err(e) => {
                warn!("Failed to render nice_errors string {}: {}", key, e);
                template.to_string()
            }
        }
    }
}

fn reply(content: String) -> Response {
    Response::Reply(ErrorReply {
        content,
        ephemeral: true,
    })
}

pub struct CooldownResponder(Strings);

impl CooldownResponder {
    pub fn new(config: Arc<ExtensionConfig>) -> Self {
        Self(Strings { config })
    }
}

impl ErrorResponder for CooldownResponder {
    fn respond(&self, failure: &Failure<'_>) -> Response {
        if failure.class != ErrorClass::Cooldown {
            return Response::Pass;
        }
        let retry_after = failure.retry_after.unwrap_or_default().ceil() as u64;
        reply(self.0.render(
            failure.locale,
            "error_cooldown_exceeded",
            "You are on cooldown. Try again in {{ retry_after }} seconds.",
            context! { retry_after },
        ))
    }
}

pub struct NotFoundResponder(Strings);

impl NotFoundResponder {
    pub fn new(config: Arc<ExtensionConfig>) -> Self {
        Self(Strings { config })
    }
}

impl ErrorResponder for NotFoundResponder {
    fn respond(&self, failure: &Failure<'_>) -> Response {
        if failure.class != ErrorClass::NotFound {
            return Response::Pass;
        }
        let similar = failure
            .invoked
            .and_then(|invoked| most_similar(invoked, &failure.command_names));
        match similar {
            Some(similar_command) => reply(self.0.render(
                failure.locale,
                "error_command_not_found",
                "This command does not exist. Did you mean `{{ similar_command }}`?",
                context! { similar_command },
            )),
            None => Response::Silent,
        }
    }
}

pub struct ForbiddenResponder(Strings);

impl ForbiddenResponder {
    pub fn new(config: Arc<ExtensionConfig>) -> Self {
        Self(Strings { config })
    }
}

impl ErrorResponder for ForbiddenResponder {
    fn respond(&self, failure: &Failure<'_>) -> Response {
        if failure.class != ErrorClass::Forbidden {
            return Response::Pass;
        }
        let mut content = self.0.render(
            failure.locale,
            "error_missing_permissions",
            "I don't have the permissions to do that.",
            context! {},
        );
        if let Some(error) = failure.error {
            let detail = error.to_string();
            let detail = detail.rsplit(':').next().unwrap_or_default().trim();
            if !detail.is_empty() {
                content.push_str(&format!("\n`{}`", detail));
            }
        }
        reply(content)
    }
}

/// Answers every failure that reaches it.
pub struct GenericResponder(Strings);

impl GenericResponder {
    pub fn new(config: Arc<ExtensionConfig>) -> Self {
        Self(Strings { config })
    }
}

impl ErrorResponder for GenericResponder {
    fn respond(&self, failure: &Failure<'_>) -> Response {
        if failure.class == ErrorClass::NotFound {
            return Response::Silent;
        }
        let mut content = self.0.render(
            failure.locale,
            "error_generic",
            "An error occurred while running this command.",
            context! {},
        );
        if let Some(reference) = failure.reference {
            content.push_str("\n\n");
            content.push_str(&self.0.render(
                failure.locale,
                "reported_to_devs",
                "-# Reported to the developers - `{{ reference }}`",
                context! { reference => reference.to_string() },
            ));
        }
        reply(content)
    }
}
