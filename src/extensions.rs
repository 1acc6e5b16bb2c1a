//! Extensions shipped with the bot.

pub mod branding;
pub mod deabbreviator;
pub mod help;
pub mod listings;
pub mod nice_errors;
pub mod ping;
pub mod status_post;

use crate::extension::Registry;

/// Every built-in extension, by name.
pub fn registry() -> Registry {
    Registry::new()
        .with(branding::Branding)
        .with(deabbreviator::Deabbreviator)
        .with(help::Help)
        .with(listings::Listings)
        .with(nice_errors::NiceErrors)
        .with(ping::Ping)
        .with(status_post::StatusPost)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extension::ModuleSource;
    use crate::extension::loader::validate_module;

    #[test]
    fn test_builtin_modules_honour_the_contract() {
        let registry = registry();
        for name in registry.names() {
            let module = registry.import(name).unwrap();
            validate_module(module.as_ref()).unwrap_or_else(|e| panic!("{name}: {e}"));
        }
    }

    #[test]
    fn test_builtin_defaults_match_their_schema() {
        let registry = registry();
        for name in registry.names() {
            let module = registry.import(name).unwrap();
            let default = module.default_config().unwrap();
            if let Some(schema) = module.schema() {
                schema
                    .validate(&default)
                    .unwrap_or_else(|e| panic!("{name}: {e}"));
            }
        }
    }
}
