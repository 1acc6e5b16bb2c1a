//! Extensions: modules compiled into the binary and switched on or off per configuration.
//!
//! An extension is an [`ExtensionModule`] registered in a [`ModuleSource`] plus a directory
//! under the extensions root holding its assets. The [`loader`] walks that root once at
//! startup, validates each module's contract and configuration, and hands back the hooks of
//! the extensions that are ready. Patch hooks are run before that by the [`patcher`].

pub mod hook;
pub mod loader;
pub mod patcher;
pub mod schema;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_json::Value;

pub use crate::extension::hook::BoundHook;
pub use crate::extension::hook::Hook;
pub use crate::extension::hook::HookArgs;
pub use crate::extension::hook::HookBot;
pub use crate::extension::hook::HookKind;
pub use crate::extension::hook::HookParam;
pub use crate::extension::loader::ExtensionLoader;
pub use crate::extension::loader::LoadedExtensions;
pub use crate::extension::schema::Schema;
pub use crate::extension::schema::SchemaError;

use crate::i18n::Locale;
use crate::i18n::TranslationNode;
use crate::i18n::View;
use crate::i18n::translation::empty;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum LoadError {
    #[error("Failed to import extension {name}: {reason}")]
    Import { name: String, reason: String },

    #[error("Extension {name} violates the extension contract: {reason}")]
    Contract { name: String, reason: String },

    #[error("Configuration of extension {name} is invalid: {source}")]
    Config {
        name: String,
        #[source]
        source: SchemaError,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// What an extension module declares about itself.
pub trait ExtensionModule: Send + Sync {
    fn name(&self) -> &'static str;

    /// Configuration used when the user configures nothing. Must be a mapping with a boolean
    /// `enabled` key.
    fn default_config(&self) -> Option<Value>;

    fn schema(&self) -> Option<Schema> {
        None
    }

    fn hooks(&self) -> Vec<Hook>;

    /// Runs before any extension is loaded.
    fn patch(&self) -> Option<Hook> {
        None
    }
}

/// Where extension modules are imported from.
pub trait ModuleSource: Send + Sync {
    fn import(&self, name: &str) -> Result<Arc<dyn ExtensionModule>, LoadError>;
}

/// Modules compiled into the binary, by name.
#[derive(Default, Clone)]
pub struct Registry {
    modules: IndexMap<String, Arc<dyn ExtensionModule>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, module: impl ExtensionModule + 'static) -> Self {
        self.register(Arc::new(module));
        self
    }

    pub fn register(&mut self, module: Arc<dyn ExtensionModule>) {
        self.modules.insert(module.name().to_string(), module);
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().map(String::as_str)
    }
}

impl ModuleSource for Registry {
    /// Directory names may spell the module name with hyphens.
    fn import(&self, name: &str) -> Result<Arc<dyn ExtensionModule>, LoadError> {
        self.modules
            .get(name)
            .or_else(|| self.modules.get(&name.replace('-', "_")))
            .cloned()
            .ok_or_else(|| LoadError::Import {
                name: name.to_string(),
                reason: "no module with that name is registered".to_string(),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigOrigin {
    /// The module's declared default.
    Default,
    /// Set by the user.
    User,
}

/// Effective configuration of one extension, as handed to its hooks.
#[derive(Debug, Clone)]
pub struct ExtensionConfig {
    pub name: String,
    pub directory: PathBuf,
    pub values: Value,
    pub origin: ConfigOrigin,
    /// Extension-wide strings from `translations.yml`.
    pub translations: Option<Arc<TranslationNode>>,
}

impl ExtensionConfig {
    pub fn new(name: impl Into<String>, directory: PathBuf, values: Value, origin: ConfigOrigin) -> Self {
        Self {
            name: name.into(),
            directory,
            values,
            origin,
            translations: None,
        }
    }

    pub fn with_translations(mut self, strings: TranslationNode) -> Self {
        self.translations = Some(Arc::new(strings));
        self
    }

    pub fn enabled(&self) -> bool {
        self.values
            .get("enabled")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Deserializes the configuration into the extension's typed config.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.values.clone())
    }

    /// The extension-wide strings read through `locale`; empty when there are none.
    pub fn strings(&self, locale: Locale) -> View<'_> {
        let node = self.translations.as_deref().unwrap_or_else(|| empty());
        View::new(node, locale, Locale::default())
    }
}

/// Where one discovered extension ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionState {
    Discovered,
    ImportFailed,
    ContractInvalid,
    Disabled,
    ConfigInvalid,
    Ready,
}

impl fmt::Display for ExtensionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Discovered => "discovered",
            Self::ImportFailed => "import failed",
            Self::ContractInvalid => "contract invalid",
            Self::Disabled => "disabled",
            Self::ConfigInvalid => "config invalid",
            Self::Ready => "ready",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct ExtensionDescriptor {
    pub name: String,
    pub directory: PathBuf,
    pub state: ExtensionState,
    /// Effective configuration, once it was resolved.
    pub config: Option<Arc<ExtensionConfig>>,
}
