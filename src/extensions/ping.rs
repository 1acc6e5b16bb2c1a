//! Latency check over slash, prefix and HTTP.

use axum::Json;
use axum::routing::get;
use futures::FutureExt;
use futures::future::BoxFuture;
use log::info;
use minijinja::context;
use poise::CreateReply;
use poise::serenity_prelude as serenity;
use serde::Deserialize;
use serde_json::Value;
use serde_json::json;

use crate::bot::Context;
use crate::bot::Data;
use crate::bot::Error;
use crate::bot::checks::Invocation;
use crate::bot::embed::embed;
use crate::bot::translations;
use crate::cooldown::BucketType;
use crate::cooldown::Cooldown;
use crate::extension::ExtensionModule;
use crate::extension::Hook;
use crate::extension::HookArgs;
use crate::extension::HookParam;
use crate::extension::Schema;
use crate::i18n::render;
use crate::web::WebBot;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
#[allow(dead_code)]
pub struct PingConfig {
    pub enabled: bool,
}

pub struct Ping;

impl ExtensionModule for Ping {
    fn name(&self) -> &'static str {
        "ping"
    }

    fn default_config(&self) -> Option<Value> {
        Some(json!({ "enabled": true }))
    }

    fn schema(&self) -> Option<Schema> {
        Some(Schema::of::<PingConfig>())
    }

    fn hooks(&self) -> Vec<Hook> {
        vec![
            Hook::setup(&[HookParam::Bot], setup),
            Hook::setup_webserver(&[HookParam::App, HookParam::Bot], setup_webserver),
            Hook::on_startup(&[HookParam::Config], on_startup),
        ]
    }
}

pub fn cooldown() -> Result<Cooldown<Data, Invocation>, crate::cooldown::CooldownError> {
    Cooldown::builder()
        .key("ping")
        .limit(1u32)
        .per(5u32)
        .bucket(BucketType::User)
        .strong(true)
        .build()
}

fn setup(mut args: HookArgs<'_>) -> BoxFuture<'_, anyhow::Result<()>> {
    async move {
        let setup = args.bot_setup()?;
        setup.add_command(ping());
        setup.add_cooldown("ping", cooldown()?);
        Ok(())
    }
    .boxed()
}

fn setup_webserver(args: HookArgs<'_>) -> BoxFuture<'_, anyhow::Result<()>> {
    async move {
        let bot = args.rest_bot().cloned();
        args.app()?.route(
            "/ping",
            get(move || {
                let bot = bot.clone();
                async move { Json(status(bot.as_ref()).await) }
            }),
        );
        Ok(())
    }
    .boxed()
}

/// Body of `GET /ping`.
async fn status(bot: Option<&WebBot>) -> Value {
    let Some(bot) = bot else {
        return json!({ "message": "Bot is offline" });
    };
    match bot.get_current_user().await {
        Ok(user) => json!({ "message": format!("{} is online", user.name) }),
        Err(_) => json!({ "message": "Bot is offline" }),
    }
}

fn on_startup(args: HookArgs<'_>) -> BoxFuture<'_, anyhow::Result<()>> {
    async move {
        info!("Ping extension config: {}", args.config()?.values);
        Ok(())
    }
    .boxed()
}

/// Check the latency of the bot
#[poise::command(slash_command, prefix_command)]
pub async fn ping(
    ctx: Context<'_>,
    #[description = "Only show the response to you"] ephemeral: Option<bool>,
    #[description = "Respond with an embed"] use_embed: Option<bool>,
) -> Result<(), Error> {
    let ephemeral = ephemeral.unwrap_or(false);
    if ephemeral {
        ctx.defer_ephemeral().await?;
    } else {
        ctx.defer().await?;
    }
    let latency = ctx.ping().await.as_millis() as u64;

    let reply = if use_embed.unwrap_or(false) {
        let template = translations(ctx).text("response").unwrap_or("Pong! {{ latency }}ms");
        let description = render(template, context! { latency })?;
        CreateReply::default().embed(
            embed()
                .title("Pong!")
                .description(description)
                .colour(serenity::Colour::BLURPLE),
        )
    } else {
        CreateReply::default().content(format!("Pong! {}ms", latency))
    };
    ctx.send(reply.ephemeral(ephemeral)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use super::*;
    use crate::web::WebApp;

    #[test]
    fn test_cooldown_is_valid() {
        assert!(cooldown().is_ok());
    }

    #[tokio::test]
    async fn test_ping_route_without_bot_reports_offline() {
        let app = WebApp::new();
        let hook = Hook::setup_webserver(&[HookParam::App, HookParam::Bot], setup_webserver);
        let config = crate::extension::ExtensionConfig::new(
            "ping",
            std::path::PathBuf::from("extensions/ping"),
            json!({ "enabled": true }),
            crate::extension::ConfigOrigin::Default,
        );
        hook.invoke(crate::extension::hook::HookRuntime {
            bot: None,
            config: &config,
            app: Some(&app),
        })
        .await
        .unwrap();

        let response = app
            .router()
            .oneshot(Request::builder().uri("/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["message"], "Bot is offline");
    }
}
