//! Applying command translations to poise commands.

use std::sync::Arc;

use indexmap::IndexMap;
use log::error;
use log::info;
use log::warn;
use poise::Command;

use crate::i18n::CommandTranslation;
use crate::i18n::ExtensionTranslation;
use crate::i18n::Locale;
use crate::i18n::RawTranslation;
use crate::i18n::TranslationNode;

/// The `strings` tree of a command, attached as its poise custom data.
#[derive(Debug, Clone)]
pub struct CommandStrings(pub Arc<TranslationNode>);

/// Merges the command translations of every extension. The first definition of a name wins.
pub fn merge_command_translations(
    translations: &[ExtensionTranslation],
) -> Option<IndexMap<String, CommandTranslation>> {
    let mut sets = translations
        .iter()
        .filter_map(|t| t.commands.as_ref())
        .peekable();
    sets.peek()?;

    let mut merged = IndexMap::new();
    for set in sets {
        for (name, translation) in set {
            if merged.contains_key(name) {
                warn!("Command {} is already defined, skipping", name);
                continue;
            }
            merged.insert(name.clone(), translation.clone());
        }
    }
    Some(merged)
}

fn default_or<'t>(translation: &'t RawTranslation, default: Locale, fallback: &'t str) -> String {
    translation.get(default).unwrap_or(fallback).to_string()
}

/// Localizes `commands` and their subcommands in place. Returns `(failed, total)`.
pub fn localize_commands<U, E>(
    commands: &mut [Command<U, E>],
    translations: &IndexMap<String, CommandTranslation>,
    default: Locale,
) -> (usize, usize) {
    let mut failed = 0;
    let mut total = 0;

    for command in commands {
        total += 1;
        let Some(translation) = translations.get(&command.name) else {
            warn!(
                "Command /{} is not defined in translations, continuing...",
                command.qualified_name
            );
            failed += 1;
            continue;
        };

        let context_menu_only = command.slash_action.is_none()
            && command.prefix_action.is_none()
            && command.context_menu_action.is_some();

        if let Some(name) = &translation.name {
            if context_menu_only {
                let current = command.context_menu_name.clone().unwrap_or_default();
                command.context_menu_name = Some(default_or(name, default, &current));
            } else {
                command.name = default_or(name, default, &command.name);
            }
            command.name_localizations = name.to_localizations();
        }
        if let Some(description) = &translation.description {
            let current = command.description.clone().unwrap_or_default();
            command.description = Some(default_or(description, default, &current));
            command.description_localizations = description.to_localizations();
        }
        if let Some(strings) = &translation.strings {
            command.custom_data = Box::new(CommandStrings(Arc::new(strings.clone())));
        }

        if let Some(options) = &translation.options {
            for parameter in &mut command.parameters {
                let Some(option) = options.get(&parameter.name) else {
                    warn!(
                        "Option {} of command /{} is not defined in translations, continuing...",
                        parameter.name, command.qualified_name
                    );
                    continue;
                };
                if let Some(name) = &option.name {
                    parameter.name = default_or(name, default, &parameter.name);
                    parameter.name_localizations = name.to_localizations();
                }
                if let Some(description) = &option.description {
                    let current = parameter.description.clone().unwrap_or_default();
                    parameter.description = Some(default_or(description, default, &current));
                    parameter.description_localizations = description.to_localizations();
                }
            }
        }

        if !command.subcommands.is_empty() {
            let empty = IndexMap::new();
            let (sub_failed, sub_total) = localize_commands(
                &mut command.subcommands,
                translation.commands.as_ref().unwrap_or(&empty),
                default,
            );
            failed += sub_failed;
            total += sub_total;
        }
    }

    (failed, total)
}

/// Localizes every command with the merged translations of all extensions.
pub fn apply<U, E>(
    commands: &mut [Command<U, E>],
    translations: &[ExtensionTranslation],
    default: Locale,
) {
    info!("Applying translations...");
    let Some(merged) = merge_command_translations(translations) else {
        warn!("No command translations found, skipping...");
        return;
    };

    let (failed, total) = localize_commands(commands, &merged, default);
    let localized = total - failed;
    if total > 0 && failed == total {
        error!("Localized {}/{} commands.", localized, total);
    } else if failed > 0 {
        warn!("Localized {}/{} commands.", localized, total);
    } else {
        info!("Localized {}/{} commands.", localized, total);
    }
}
