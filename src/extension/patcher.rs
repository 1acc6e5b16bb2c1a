//! Runs the patch hooks of enabled extensions before anything else is loaded.

use log::debug;
use log::error;
use log::info;

use crate::config::Config;
use crate::extension::ExtensionLoader;
use crate::extension::ModuleSource;
use crate::extension::hook::HookRuntime;

/// Runs patches one at a time in discovery order, each awaited before the next starts.
/// A failing patch is logged and does not stop the others. Returns how many succeeded.
pub async fn run_patches<S: ModuleSource>(loader: &ExtensionLoader<S>, config: &Config) -> usize {
    let mut applied = 0;

    for candidate in loader.discover() {
        let Ok(module) = loader.source().import(&candidate.name) else {
            continue;
        };
        let Some(patch) = module.patch() else {
            continue;
        };
        // Falls back to the module default when the user has no section, so enabled-by-default
        // patches run on a bare config.
        let Some(extension) = loader.effective_config(module.as_ref(), &candidate, config) else {
            continue;
        };
        if !extension.enabled() {
            debug!("Skipping patch of disabled extension {}", candidate.name);
            continue;
        }
        if let Err(reason) = patch.validate() {
            error!("Invalid patch for extension {}: {}", candidate.name, reason);
            continue;
        }

        info!("Loading patch for extension {}", candidate.name);
        let runtime = HookRuntime {
            bot: None,
            config: &extension,
            app: None,
        };
        match patch.invoke(runtime).await {
            Ok(()) => applied += 1,
            Err(e) => error!("Patch for extension {} failed: {:?}", candidate.name, e),
        }
    }

    applied
}
