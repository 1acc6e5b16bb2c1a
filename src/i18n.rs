//! Internationalization: locales, translation trees and the locale overlay over them.
//!
//! Translation data is parsed once into a [`TranslationNode`] tree. Reading it goes through a
//! [`View`], which resolves every leaf it reaches to the string of its current locale (falling
//! back to its default locale) without ever resolving more of the tree than is asked for.

pub mod locale;
pub mod localize;
pub mod node;
pub mod translation;
pub mod view;

use std::sync::LazyLock;

use minijinja::Environment;
use serde::Serialize;

pub use crate::i18n::locale::Locale;
pub use crate::i18n::localize::CommandStrings;
pub use crate::i18n::node::RawTranslation;
pub use crate::i18n::node::Scalar;
pub use crate::i18n::node::TranslationNode;
pub use crate::i18n::translation::CommandTranslation;
pub use crate::i18n::translation::ExtensionTranslation;
pub use crate::i18n::translation::NameDescription;
pub use crate::i18n::translation::empty;
pub use crate::i18n::translation::load_translation;
pub use crate::i18n::view::Resolved;
pub use crate::i18n::view::View;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum I18nError {
    #[error("Invalid locale {0}")]
    InvalidLocale(String),

    #[error("No translation for `{path}` in {locale} or the default locale")]
    MissingTranslation { path: String, locale: Locale },

    #[error("Key `{path}` not found")]
    KeyNotFound { path: String },

    #[error("Index {index} out of range for `{path}`")]
    IndexOutOfRange { path: String, index: usize },

    #[error("`{path}` is not a record")]
    NotARecord { path: String },

    #[error("`{path}` is not a sequence")]
    NotASequence { path: String },

    #[error("`{path}` does not resolve to text")]
    NotText { path: String },

    #[error("Command `{command}` nests deeper than three levels")]
    TooDeep { command: String },

    #[error("Failed to parse translations: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Failed to read translations: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to render template: {0}")]
    Render(#[from] minijinja::Error),
}

/// Wraps `node` in a view bound to `locale`, falling back to `default`.
pub fn wrap<'a>(
    node: &'a TranslationNode,
    locale: &str,
    default: &str,
) -> Result<View<'a>, I18nError> {
    Ok(View::new(node, locale.parse()?, default.parse()?))
}

/// Things a locale can be applied to.
pub trait ApplyLocale {
    type Output;

    fn apply_locale(
        self,
        locale: Option<&str>,
        default: Option<&str>,
    ) -> Result<Self::Output, I18nError>;
}

impl<'a> ApplyLocale for &'a TranslationNode {
    type Output = View<'a>;

    fn apply_locale(
        self,
        locale: Option<&str>,
        default: Option<&str>,
    ) -> Result<Self::Output, I18nError> {
        Ok(View::new(
            self,
            Locale::parse_or_default(locale)?,
            Locale::parse_or_default(default)?,
        ))
    }
}

/// An existing view is retargeted in place and handed back, never wrapped again.
impl<'v, 'a> ApplyLocale for &'v View<'a> {
    type Output = &'v View<'a>;

    fn apply_locale(
        self,
        locale: Option<&str>,
        default: Option<&str>,
    ) -> Result<Self::Output, I18nError> {
        let locale = Locale::parse_or_default(locale)?;
        let default = Locale::parse_or_default(default)?;
        self.set_locale(locale);
        self.set_default_locale(default);
        Ok(self)
    }
}

/// Applies `locale` (default locale when `None`) to a node or a view.
pub fn apply_locale<T: ApplyLocale>(
    target: T,
    locale: Option<&str>,
    default: Option<&str>,
) -> Result<T::Output, I18nError> {
    target.apply_locale(locale, default)
}

static TEMPLATES: LazyLock<Environment<'static>> = LazyLock::new(Environment::new);

/// Renders `{{ name }}` placeholders of a resolved string.
pub fn render<S: Serialize>(template: &str, ctx: S) -> Result<String, I18nError> {
    Ok(TEMPLATES.render_str(template, ctx)?)
}

#[cfg(test)]
mod tests {
    use minijinja::context;

    use super::*;

    fn greeting() -> TranslationNode {
        TranslationNode::from_yaml_str("hello:\n  en-US: Hello\n  fr: Bonjour\n").unwrap()
    }

    #[test]
    fn test_wrap_rejects_unknown_locale() {
        let node = greeting();
        assert!(matches!(
            wrap(&node, "xx", "en-US"),
            Err(I18nError::InvalidLocale(_))
        ));
    }

    #[test]
    fn test_apply_locale_on_node_defaults_missing_locale() {
        let node = greeting();
        let view = apply_locale(&node, None, None).unwrap();
        assert_eq!(view.locale(), Locale::EnUs);
        assert_eq!(view.text("hello").unwrap(), "Hello");
    }

    #[test]
    fn test_apply_locale_on_view_retargets_in_place() {
        let node = greeting();
        let view = wrap(&node, "en-US", "en-US").unwrap();
        let same = apply_locale(&view, Some("fr"), None).unwrap();

        assert!(std::ptr::eq(same, &view));
        assert_eq!(view.text("hello").unwrap(), "Bonjour");
    }

    #[test]
    fn test_render_fills_placeholders() {
        let out = render("Pong! {{ latency }}ms", context! { latency => 42 }).unwrap();
        assert_eq!(out, "Pong! 42ms");
    }
}
