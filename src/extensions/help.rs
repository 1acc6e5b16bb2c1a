//! Paginated help built from the category pages shipped with the extension.

pub mod pages;

use futures::FutureExt;
use futures::future::BoxFuture;
use log::info;
use minijinja::context;
use serde::Deserialize;
use serde_json::Value;
use serde_json::json;

use crate::bot::Context;
use crate::bot::Error;
use crate::bot::embed::embed;
use crate::bot::pagination::paginate;
use crate::bot::translations;
use crate::bot::translations::invocation_locale;
use crate::extension::ExtensionModule;
use crate::extension::Hook;
use crate::extension::HookArgs;
use crate::extension::HookParam;
use crate::extension::Schema;
use crate::extensions::help::pages::HelpCategory;
use crate::extensions::help::pages::RenderedPage;
use crate::extensions::help::pages::UiStrings;
use crate::extensions::help::pages::load_categories;
use crate::extensions::help::pages::render_pages;
use crate::i18n::View;
use crate::i18n::render;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
#[allow(dead_code)]
pub struct HelpConfig {
    pub enabled: bool,
}

/// Categories loaded at setup, read by the `help` command.
pub struct HelpPages(pub Vec<HelpCategory>);

pub struct Help;

impl ExtensionModule for Help {
    fn name(&self) -> &'static str {
        "help"
    }

    fn default_config(&self) -> Option<Value> {
        Some(json!({ "enabled": false }))
    }

    fn schema(&self) -> Option<Schema> {
        Some(Schema::of::<HelpConfig>())
    }

    fn hooks(&self) -> Vec<Hook> {
        vec![Hook::setup(&[HookParam::Bot, HookParam::Config], setup)]
    }
}

fn setup(mut args: HookArgs<'_>) -> BoxFuture<'_, anyhow::Result<()>> {
    async move {
        let directory = args.config()?.directory.join("pages");
        let categories = load_categories(&directory)?;
        info!(
            "Loaded {} help categories from {}",
            categories.len(),
            directory.display()
        );
        args.bot_setup()?
            .add_state(HelpPages(categories))
            .add_command(help());
        Ok(())
    }
    .boxed()
}

fn ui_strings(strings: &View<'_>) -> UiStrings {
    let default = UiStrings::default();
    let text = |key: &str, fallback: String| {
        strings
            .text(key)
            .map(str::to_string)
            .unwrap_or(fallback)
    };
    UiStrings {
        quick_tips_title: text("quick_tips_title", default.quick_tips_title),
        examples_title: text("examples_title", default.examples_title),
        related_commands_title: text("related_commands_title", default.related_commands_title),
    }
}

fn into_embed(page: RenderedPage) -> poise::serenity_prelude::CreateEmbed {
    page.fields.into_iter().fold(
        embed()
            .title(page.title)
            .description(page.description)
            .colour(page.color),
        |embed, (name, value)| embed.field(name, value, false),
    )
}

/// Get help about the bot
#[poise::command(slash_command)]
pub async fn help(ctx: Context<'_>) -> Result<(), Error> {
    let Some(HelpPages(categories)) = ctx.data().state::<HelpPages>() else {
        return Err("help pages are not loaded".into());
    };
    let (ui, indicator) = {
        let strings = translations(ctx);
        let indicator = strings
            .text("page_indicator")
            .unwrap_or("{{ current }}/{{ total }}")
            .to_string();
        (ui_strings(&strings), indicator)
    };

    let embeds = render_pages(categories, invocation_locale(ctx), &ui)
        .into_iter()
        .map(into_embed)
        .collect();
    paginate(ctx, embeds, move |current, total| {
        render(&indicator, context! { current, total })
            .unwrap_or_else(|_| format!("{current}/{total}"))
    })
    .await
}
