//! Typed shape of an extension's `translations.yml`.

use std::path::Path;
use std::sync::LazyLock;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::i18n::I18nError;
use crate::i18n::Locale;
use crate::i18n::RawTranslation;
use crate::i18n::TranslationNode;
use crate::i18n::View;

/// Discord allows a command, a group and a subcommand: three levels.
pub const MAX_COMMAND_DEPTH: usize = 3;

static EMPTY: LazyLock<TranslationNode> = LazyLock::new(TranslationNode::default);

/// An empty record, for callers that need a view when no strings exist.
pub fn empty() -> &'static TranslationNode {
    &EMPTY
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NameDescription {
    #[serde(default)]
    pub name: Option<RawTranslation>,
    #[serde(default)]
    pub description: Option<RawTranslation>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommandTranslation {
    #[serde(default)]
    pub name: Option<RawTranslation>,
    #[serde(default)]
    pub description: Option<RawTranslation>,
    /// Free-form strings the command reads at runtime.
    #[serde(default)]
    pub strings: Option<TranslationNode>,
    /// Parameters, keyed by their name in code.
    #[serde(default)]
    pub options: Option<IndexMap<String, NameDescription>>,
    #[serde(default)]
    pub commands: Option<IndexMap<String, CommandTranslation>>,
}

impl CommandTranslation {
    fn check_depth(&self, name: &str, depth: usize) -> Result<(), I18nError> {
        if depth > MAX_COMMAND_DEPTH {
            return Err(I18nError::TooDeep {
                command: name.to_string(),
            });
        }
        for (child, translation) in self.commands.iter().flatten() {
            translation.check_depth(&format!("{name} {child}"), depth + 1)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExtensionTranslation {
    #[serde(default)]
    pub commands: Option<IndexMap<String, CommandTranslation>>,
    #[serde(default)]
    pub strings: Option<TranslationNode>,
}

impl ExtensionTranslation {
    pub fn from_yaml_str(content: &str) -> Result<Self, I18nError> {
        let translation: Self = serde_yaml::from_str(content)?;
        for (name, command) in translation.commands.iter().flatten() {
            command.check_depth(name, 1)?;
        }
        Ok(translation)
    }

    /// The extension-wide strings read through `locale`.
    pub fn strings(&self, locale: Locale) -> View<'_> {
        View::new(
            self.strings.as_ref().unwrap_or_else(|| empty()),
            locale,
            Locale::default(),
        )
    }
}

pub fn load_translation(path: &Path) -> Result<ExtensionTranslation, I18nError> {
    let content = std::fs::read_to_string(path)?;
    ExtensionTranslation::from_yaml_str(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command_translation() {
        let translation = ExtensionTranslation::from_yaml_str(
            r#"
commands:
  ping:
    name:
      en-US: ping
      fr: ping
    description:
      en-US: Check the latency
    options:
      ephemeral:
        name:
          en-US: ephemeral
    strings:
      response:
        en-US: "Pong! {{ latency }}ms"
strings:
  footer:
    en-US: Footer
"#,
        )
        .unwrap();

        let commands = translation.commands.as_ref().unwrap();
        let ping = &commands["ping"];
        assert_eq!(
            ping.description.as_ref().unwrap().get(Locale::EnUs),
            Some("Check the latency")
        );
        assert!(ping.options.as_ref().unwrap().contains_key("ephemeral"));
        assert_eq!(translation.strings(Locale::Fr).text("footer").unwrap(), "Footer");
    }

    #[test]
    fn test_four_levels_are_rejected() {
        let result = ExtensionTranslation::from_yaml_str(
            "commands:\n  a:\n    commands:\n      b:\n        commands:\n          c:\n            commands:\n              d: {}\n",
        );
        assert!(matches!(result, Err(I18nError::TooDeep { ref command }) if command == "a b c d"));
    }

    #[test]
    fn test_missing_sections_are_empty() {
        let translation = ExtensionTranslation::from_yaml_str("{}").unwrap();
        assert!(translation.commands.is_none());
        assert!(translation.strings(Locale::EnUs).is_empty());
    }
}
