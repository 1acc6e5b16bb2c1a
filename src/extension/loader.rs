//! Discovery and loading of extensions.

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use log::debug;
use log::error;
use log::info;
use log::warn;
use serde_json::Value;

use crate::config::Config;
use crate::extension::BoundHook;
use crate::extension::ConfigOrigin;
use crate::extension::ExtensionConfig;
use crate::extension::ExtensionDescriptor;
use crate::extension::ExtensionModule;
use crate::extension::ExtensionState;
use crate::extension::HookKind;
use crate::extension::LoadError;
use crate::extension::ModuleSource;
use crate::i18n::ExtensionTranslation;
use crate::i18n::load_translation;

pub const TRANSLATION_FILE: &str = "translations.yml";

/// One directory found under the extensions root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub name: String,
    pub directory: PathBuf,
}

/// Hooks and translations of the extensions that loaded.
#[derive(Debug, Default)]
pub struct LoadedExtensions {
    pub setup: Vec<BoundHook>,
    pub webserver: Vec<BoundHook>,
    pub startup: Vec<BoundHook>,
    pub translations: Vec<ExtensionTranslation>,
    /// Every candidate, in discovery order, with where it ended up.
    pub descriptors: Vec<ExtensionDescriptor>,
}

impl LoadedExtensions {
    pub fn ready(&self) -> impl Iterator<Item = &str> {
        self.descriptors
            .iter()
            .filter(|d| d.state == ExtensionState::Ready)
            .map(|d| d.name.as_str())
    }

    pub fn state_of(&self, name: &str) -> Option<ExtensionState> {
        self.descriptors
            .iter()
            .find(|d| d.name == name)
            .map(|d| d.state)
    }
}

struct Ready {
    module: Arc<dyn ExtensionModule>,
    config: ExtensionConfig,
    translation: Option<ExtensionTranslation>,
}

pub struct ExtensionLoader<S> {
    root: PathBuf,
    source: S,
}

impl<S: ModuleSource> ExtensionLoader<S> {
    pub fn new(root: impl Into<PathBuf>, source: S) -> Self {
        Self {
            root: root.into(),
            source,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Extension directories under the root, sorted by name. Names ending in `_` and plain
    /// files are skipped; a missing root yields nothing.
    pub fn discover(&self) -> Vec<Candidate> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(
                    "Cannot read extensions directory {}: {}",
                    self.root.display(),
                    e
                );
                return Vec::new();
            }
        };

        let mut candidates: Vec<Candidate> = entries
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
            .filter_map(|entry| {
                let name = entry.file_name().into_string().ok()?;
                (!name.ends_with('_')).then(|| Candidate {
                    name,
                    directory: entry.path(),
                })
            })
            .collect();
        candidates.sort_by(|a, b| a.name.cmp(&b.name));
        candidates
    }

    /// Effective configuration of a module: the user's if set, else the module's default.
    pub fn effective_config(
        &self,
        module: &dyn ExtensionModule,
        candidate: &Candidate,
        config: &Config,
    ) -> Option<ExtensionConfig> {
        let (values, origin) = match config.extension(&candidate.name) {
            Some(values) => (values.clone(), ConfigOrigin::User),
            None => (module.default_config()?, ConfigOrigin::Default),
        };
        Some(ExtensionConfig::new(
            candidate.name.clone(),
            candidate.directory.clone(),
            values,
            origin,
        ))
    }

    /// Loads every discovered extension. Failures are logged and only affect the
    /// extension they occur in.
    pub fn load(&self, config: &mut Config) -> LoadedExtensions {
        let mut loaded = LoadedExtensions::default();

        for candidate in self.discover() {
            let (state, ready) = match self.load_one(&candidate, config) {
                Ok(Some(ready)) => (ExtensionState::Ready, Some(ready)),
                Ok(None) => (ExtensionState::Disabled, None),
                Err((state, e)) => {
                    error!("{}", e);
                    (state, None)
                }
            };

            let mut descriptor = ExtensionDescriptor {
                name: candidate.name.clone(),
                directory: candidate.directory.clone(),
                state,
                config: None,
            };

            if let Some(ready) = ready {
                let bound = Arc::new(ready.config);
                for hook in ready.module.hooks() {
                    let target = match hook.kind() {
                        HookKind::Setup => &mut loaded.setup,
                        HookKind::SetupWebserver => &mut loaded.webserver,
                        HookKind::OnStartup => &mut loaded.startup,
                        HookKind::Patch => continue,
                    };
                    target.push(BoundHook {
                        hook,
                        config: bound.clone(),
                    });
                }
                loaded.translations.extend(ready.translation);
                descriptor.config = Some(bound);
            }
            loaded.descriptors.push(descriptor);
        }

        loaded
    }

    fn load_one(
        &self,
        candidate: &Candidate,
        config: &mut Config,
    ) -> Result<Option<Ready>, (ExtensionState, LoadError)> {
        let name = candidate.name.as_str();
        let module = self
            .source
            .import(name)
            .map_err(|e| (ExtensionState::ImportFailed, e))?;

        let contract = |reason: String| {
            (
                ExtensionState::ContractInvalid,
                LoadError::Contract {
                    name: name.to_string(),
                    reason,
                },
            )
        };

        let extension = self
            .effective_config(module.as_ref(), candidate, config)
            .ok_or_else(|| contract("does not have a default configuration".to_string()))?;
        if extension.origin == ConfigOrigin::Default {
            config.set_extension(name, extension.values.clone());
        }
        if !extension.enabled() {
            debug!("Extension {} is disabled", name);
            return Ok(None);
        }

        info!("Loading extension {}", name);
        validate_module(module.as_ref()).map_err(contract)?;

        if let Some(schema) = module.schema() {
            if let Err(e) = schema.validate(&extension.values) {
                match extension.origin {
                    ConfigOrigin::User => {
                        return Err((
                            ExtensionState::ConfigInvalid,
                            LoadError::Config {
                                name: name.to_string(),
                                source: e,
                            },
                        ));
                    }
                    ConfigOrigin::Default => warn!(
                        "Default configuration for extension {} does not match schema: {}",
                        name, e
                    ),
                }
            }
        } else {
            warn!("Extension {} does not have a schema", name);
        }

        let translation = load_extension_translation(candidate);
        let extension = match translation.as_ref().and_then(|t| t.strings.clone()) {
            Some(strings) => extension.with_translations(strings),
            None => extension,
        };

        Ok(Some(Ready {
            module,
            config: extension,
            translation,
        }))
    }
}

/// Checks what a module declares against the extension contract.
pub fn validate_module(module: &dyn ExtensionModule) -> Result<(), String> {
    match module.default_config() {
        Some(Value::Object(default)) => match default.get("enabled") {
            Some(Value::Bool(_)) => {}
            Some(other) => {
                return Err(format!(
                    "`enabled` of the default configuration must be a boolean, got {other}"
                ));
            }
            None => {
                return Err(
                    "does not have an enabled key in its default configuration".to_string(),
                );
            }
        },
        Some(other) => {
            return Err(format!(
                "has a default configuration that is not a mapping: {other}"
            ));
        }
        None => return Err("does not have a default configuration".to_string()),
    }

    let hooks = module.hooks();
    for hook in &hooks {
        if hook.kind() == HookKind::Patch {
            return Err("declares a patch hook among its lifecycle hooks".to_string());
        }
        hook.validate()?;
    }
    if let Some(patch) = module.patch() {
        if patch.kind() != HookKind::Patch {
            return Err(format!("declares a {} hook as its patch", patch.kind()));
        }
        patch.validate()?;
    }
    if !hooks
        .iter()
        .any(|h| matches!(h.kind(), HookKind::Setup | HookKind::SetupWebserver))
    {
        return Err("does not have a setup or setup_webserver hook".to_string());
    }
    Ok(())
}

fn load_extension_translation(candidate: &Candidate) -> Option<ExtensionTranslation> {
    let path = candidate.directory.join(TRANSLATION_FILE);
    if !path.is_file() {
        warn!("No translation found for extension {}", candidate.name);
        return None;
    }
    match load_translation(&path) {
        Ok(translation) => Some(translation),
        Err(e) => {
            error!("Error loading translation {}: {}", path.display(), e);
            None
        }
    }
}
