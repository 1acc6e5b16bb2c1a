//! Configuration loading.
//!
//! The configuration is a nested tree read from `config.yaml` (or `config.yml`) when present,
//! otherwise from `BOTKIT__`-prefixed environment variables. Typed sections are read out of the
//! tree; the `extensions` subtree stays free-form so every extension owns its own shape.

use std::path::Path;
use std::path::PathBuf;

use log::debug;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Map;
use serde_json::Value;

use crate::error::AppError;

/// Prefix of the environment variables read when no config file exists.
pub const ENV_PREFIX: &str = "BOTKIT";
/// Separator between hierarchical segments of an environment key.
pub const SPLIT: &str = "__";

const CONFIG_FILES: [&str; 2] = ["config.yaml", "config.yml"];

#[derive(Clone, Debug)]
pub struct Config {
    tree: Value,
    pub bot: BotConfig,
    pub r#use: UseConfig,
    pub web: WebConfig,
    pub logs: LogsConfig,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub token: Option<String>,
    pub prefix: PrefixConfig,
    pub slash: SlashConfig,
    pub owners: Vec<u64>,
    pub cache: CacheConfig,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct PrefixConfig {
    pub enabled: bool,
    /// Mention is always accepted; `None` means mention only.
    pub prefix: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SlashConfig {
    pub enabled: bool,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    #[serde(rename = "type")]
    pub kind: String,
    /// Seconds between sweeps of expired entries.
    pub purge_every: u64,
}

/// Which halves of the application run.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct UseConfig {
    pub bot: bool,
    pub backend: bool,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    pub bind: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct LogsConfig {
    pub path: PathBuf,
    pub filter: Option<String>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            token: None,
            prefix: PrefixConfig::default(),
            slash: SlashConfig::default(),
            owners: Vec::new(),
            cache: CacheConfig::default(),
        }
    }
}

impl Default for PrefixConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            prefix: None,
        }
    }
}

impl Default for SlashConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            kind: "memory".to_string(),
            purge_every: 60,
        }
    }
}

impl Default for UseConfig {
    fn default() -> Self {
        Self {
            bot: true,
            backend: true,
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:5000".to_string(),
        }
    }
}

impl Default for LogsConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("logs"),
            filter: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tree: Value::Object(Map::new()),
            bot: BotConfig::default(),
            r#use: UseConfig::default(),
            web: WebConfig::default(),
            logs: LogsConfig::default(),
        }
    }
}

impl Config {
    /// Loads the configuration from the working directory's config file, or from the
    /// process environment when there is none.
    pub fn load() -> Result<Self, AppError> {
        for candidate in CONFIG_FILES {
            let path = Path::new(candidate);
            if path.exists() {
                debug!("Reading configuration from {}", candidate);
                return Self::from_yaml_file(path);
            }
        }
        debug!("No config file found, reading configuration from environment");
        Self::from_env_vars(std::env::vars())
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self, AppError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, AppError> {
        let tree: Value = serde_yaml::from_str(content)?;
        Self::from_value(tree)
    }

    /// Builds the tree from `BOTKIT__A__B=value` pairs. Keys are split on `__` and
    /// lower-cased; values are coerced to booleans or JSON where they parse.
    pub fn from_env_vars<I>(vars: I) -> Result<Self, AppError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let prefix = format!("{ENV_PREFIX}{SPLIT}");
        let mut vars: Vec<(String, String)> = vars
            .into_iter()
            .filter_map(|(key, value)| {
                key.strip_prefix(&prefix)
                    .map(|rest| (rest.to_string(), value))
            })
            .collect();
        vars.sort();

        let mut root = Map::new();
        for (key, value) in vars {
            let parts: Vec<String> = key.split(SPLIT).map(str::to_lowercase).collect();
            insert_path(&mut root, &parts, coerce(&value), &key)?;
        }
        Self::from_value(Value::Object(root))
    }

    pub fn from_value(tree: Value) -> Result<Self, AppError> {
        let tree = match tree {
            Value::Null => Value::Object(Map::new()),
            Value::Object(map) => Value::Object(map),
            other => {
                return Err(AppError::ConfigurationError {
                    msg: format!("Configuration root must be a mapping, got {other}"),
                });
            }
        };

        Ok(Self {
            bot: section(&tree, "bot")?,
            r#use: section(&tree, "use")?,
            web: section(&tree, "web")?,
            logs: section(&tree, "logs")?,
            tree,
        })
    }

    /// Raw configuration tree.
    pub fn tree(&self) -> &Value {
        &self.tree
    }

    /// Explicit configuration of an extension, trying `name` then its hyphenated spelling.
    /// Empty or null entries count as absent.
    pub fn extension(&self, name: &str) -> Option<&Value> {
        let extensions = self.tree.get("extensions")?;
        let present = |value: &&Value| match value {
            Value::Null => false,
            Value::Object(map) => !map.is_empty(),
            _ => true,
        };
        extensions
            .get(name)
            .filter(present)
            .or_else(|| extensions.get(name.replace('_', "-")).filter(present))
    }

    /// Writes an extension's effective configuration back into the running tree.
    pub fn set_extension(&mut self, name: &str, value: Value) {
        let Value::Object(root) = &mut self.tree else {
            return;
        };
        let extensions = root
            .entry("extensions")
            .or_insert_with(|| Value::Object(Map::new()));
        if !extensions.is_object() {
            *extensions = Value::Object(Map::new());
        }
        if let Value::Object(map) = extensions {
            map.insert(name.to_string(), value);
        }
    }
}

fn section<T: DeserializeOwned + Default>(tree: &Value, key: &str) -> Result<T, AppError> {
    match tree.get(key) {
        None | Some(Value::Null) => Ok(T::default()),
        Some(value) => {
            serde_json::from_value(value.clone()).map_err(|e| AppError::ConfigurationError {
                msg: format!("Invalid `{key}` section: {e}"),
            })
        }
    }
}

fn coerce(value: &str) -> Value {
    if value.eq_ignore_ascii_case("true") {
        Value::Bool(true)
    } else if value.eq_ignore_ascii_case("false") {
        Value::Bool(false)
    } else {
        serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()))
    }
}

fn insert_path(
    root: &mut Map<String, Value>,
    parts: &[String],
    value: Value,
    key: &str,
) -> Result<(), AppError> {
    let conflict = || AppError::ConfigurationError {
        msg: format!("Key {key} in environment must be a leaf"),
    };
    let Some((last, branches)) = parts.split_last() else {
        return Err(conflict());
    };

    let mut current = root;
    for part in branches {
        let entry = current
            .entry(part.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        current = match entry {
            Value::Object(map) => map,
            _ => return Err(conflict()),
        };
    }

    if matches!(current.get(last), Some(Value::Object(_))) {
        return Err(conflict());
    }
    current.insert(last.clone(), value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_env_keys_are_nested_and_lowercased() {
        let config = Config::from_env_vars(env(&[
            ("BOTKIT__BOT__TOKEN", "abc.def"),
            ("BOTKIT__EXTENSIONS__PING__ENABLED", "true"),
            ("UNRELATED", "x"),
        ]))
        .unwrap();

        assert_eq!(config.bot.token.as_deref(), Some("abc.def"));
        assert_eq!(
            config.extension("ping"),
            Some(&json!({ "enabled": true }))
        );
        assert!(config.tree().get("unrelated").is_none());
    }

    #[test]
    fn test_env_values_are_coerced() {
        let config = Config::from_env_vars(env(&[
            ("BOTKIT__USE__BOT", "False"),
            ("BOTKIT__BOT__OWNERS", "[1, 2]"),
            ("BOTKIT__EXTENSIONS__STATUS_POST__EVERY", "30"),
            ("BOTKIT__EXTENSIONS__STATUS_POST__URL", "https://example.com/?p="),
        ]))
        .unwrap();

        assert!(!config.r#use.bot);
        assert!(config.r#use.backend);
        assert_eq!(config.bot.owners, vec![1, 2]);
        let status = config.extension("status_post").unwrap();
        assert_eq!(status["every"], json!(30));
        assert_eq!(status["url"], json!("https://example.com/?p="));
    }

    #[test]
    fn test_env_leaf_and_branch_conflict() {
        let result = Config::from_env_vars(env(&[
            ("BOTKIT__BOT__PREFIX", "!"),
            ("BOTKIT__BOT__PREFIX__ENABLED", "true"),
        ]));
        assert!(matches!(
            result,
            Err(AppError::ConfigurationError { .. })
        ));
    }

    #[test]
    fn test_yaml_defaults() {
        let config = Config::from_yaml_str("bot:\n  token: t\n").unwrap();
        assert!(config.bot.prefix.enabled);
        assert!(config.bot.prefix.prefix.is_none());
        assert!(config.bot.slash.enabled);
        assert_eq!(config.bot.cache.kind, "memory");
        assert_eq!(config.bot.cache.purge_every, 60);
        assert_eq!(config.web.bind, "0.0.0.0:5000");
        assert_eq!(config.logs.path, PathBuf::from("logs"));
    }

    #[test]
    fn test_empty_yaml_is_empty_config() {
        let config = Config::from_yaml_str("").unwrap();
        assert!(config.bot.token.is_none());
        assert!(config.extension("ping").is_none());
    }

    #[test]
    fn test_extension_lookup_tries_hyphenated_name() {
        let config =
            Config::from_yaml_str("extensions:\n  nice-errors:\n    enabled: false\n").unwrap();
        assert_eq!(
            config.extension("nice_errors"),
            Some(&json!({ "enabled": false }))
        );
    }

    #[test]
    fn test_empty_extension_entry_counts_as_absent() {
        let config = Config::from_yaml_str("extensions:\n  ping: {}\n").unwrap();
        assert!(config.extension("ping").is_none());
    }

    #[test]
    fn test_set_extension_persists_default() {
        let mut config = Config::default();
        config.set_extension("ping", json!({ "enabled": true }));
        assert_eq!(config.extension("ping"), Some(&json!({ "enabled": true })));
    }

    #[test]
    fn test_invalid_section_is_configuration_error() {
        let result = Config::from_yaml_str("use:\n  bot: [1]\n");
        assert!(matches!(
            result,
            Err(AppError::ConfigurationError { .. })
        ));
    }
}
