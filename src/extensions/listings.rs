//! Posts the server count to bot listing sites.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;
use log::error;
use log::info;
use poise::serenity_prelude as serenity;
use serde::Deserialize;
use serde_json::Value;
use serde_json::json;
use wreq::header::AUTHORIZATION;
use wreq::header::CONTENT_TYPE;

use crate::bot::Data;
use crate::bot::Listener;
use crate::extension::ExtensionModule;
use crate::extension::Hook;
use crate::extension::HookArgs;
use crate::extension::HookParam;
use crate::extension::Schema;
use crate::task::Looper;

pub const TOPGG_BASE_URL: &str = "https://top.gg/api";
pub const DISCORDSCOM_BASE_URL: &str = "https://discords.com/bots/api/bot";

const UPDATE_EVERY: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListingsConfig {
    pub enabled: bool,
    #[serde(default)]
    pub topgg_token: Option<String>,
    #[serde(default)]
    pub discordscom_token: Option<String>,
    /// Overrides [`TOPGG_BASE_URL`].
    #[serde(default)]
    pub topgg_url: Option<String>,
    /// Overrides [`DISCORDSCOM_BASE_URL`].
    #[serde(default)]
    pub discordscom_url: Option<String>,
}

fn token(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|t| !t.is_empty())
}

#[derive(Debug, thiserror::Error)]
pub enum ListingError {
    #[error("Invalid token")]
    InvalidToken,

    #[error("listing answered {0}")]
    Status(u16),

    #[error(transparent)]
    Request(#[from] wreq::Error),
}

/// One site to post the server count to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    pub name: &'static str,
    pub url: String,
    pub token: String,
}

impl ListingsConfig {
    pub fn listings(&self, bot_id: u64) -> Vec<Listing> {
        let mut listings = Vec::new();
        if let Some(token) = token(&self.topgg_token) {
            let base = self.topgg_url.as_deref().unwrap_or(TOPGG_BASE_URL);
            listings.push(Listing {
                name: "top.gg",
                url: format!("{base}/bots/{bot_id}/stats"),
                token: token.to_string(),
            });
        }
        if let Some(token) = token(&self.discordscom_token) {
            let base = self.discordscom_url.as_deref().unwrap_or(DISCORDSCOM_BASE_URL);
            listings.push(Listing {
                name: "discords.com",
                url: format!("{base}/{bot_id}/setservers"),
                token: token.to_string(),
            });
        }
        listings
    }
}

pub async fn post_count(
    client: &wreq::Client,
    listing: &Listing,
    server_count: usize,
) -> Result<(), ListingError> {
    let response = client
        .post(&listing.url)
        .header(AUTHORIZATION, listing.token.as_str())
        .header(CONTENT_TYPE, "application/json")
        .body(json!({ "server_count": server_count }).to_string())
        .send()
        .await?;
    match response.status().as_u16() {
        401 => Err(ListingError::InvalidToken),
        code if !(200..300).contains(&code) => Err(ListingError::Status(code)),
        _ => Ok(()),
    }
}

pub struct Listings;

impl ExtensionModule for Listings {
    fn name(&self) -> &'static str {
        "listings"
    }

    fn default_config(&self) -> Option<Value> {
        Some(json!({ "enabled": false }))
    }

    fn schema(&self) -> Option<Schema> {
        Some(Schema::of::<ListingsConfig>())
    }

    fn hooks(&self) -> Vec<Hook> {
        vec![Hook::setup(&[HookParam::Bot, HookParam::Config], setup)]
    }
}

fn setup(mut args: HookArgs<'_>) -> BoxFuture<'_, anyhow::Result<()>> {
    async move {
        let config: ListingsConfig = args.config()?.parse()?;
        if token(&config.topgg_token).is_none() && token(&config.discordscom_token).is_none() {
            error!("Top.gg or Discords.com token not found");
            return Ok(());
        }
        args.bot_setup()?.add_listener(StartOnReady {
            config: Arc::new(config),
            client: wreq::Client::builder().build()?,
            started: AtomicBool::new(false),
        });
        Ok(())
    }
    .boxed()
}

struct StartOnReady {
    config: Arc<ListingsConfig>,
    client: wreq::Client,
    started: AtomicBool,
}

#[async_trait]
impl Listener for StartOnReady {
    async fn on_event(
        &self,
        ctx: &serenity::Context,
        event: &serenity::FullEvent,
        _data: &Data,
    ) -> anyhow::Result<()> {
        if let serenity::FullEvent::Ready { .. } = event
            && !self.started.swap(true, Ordering::SeqCst)
        {
            Arc::new(CountLoop {
                ctx: ctx.clone(),
                config: self.config.clone(),
                client: self.client.clone(),
            })
            .spawn();
        }
        Ok(())
    }
}

struct CountLoop {
    ctx: serenity::Context,
    config: Arc<ListingsConfig>,
    client: wreq::Client,
}

#[async_trait]
impl Looper for CountLoop {
    fn name(&self) -> &str {
        "Listings count"
    }

    fn interval(&self) -> Duration {
        UPDATE_EVERY
    }

    async fn loop_func(&self) -> anyhow::Result<()> {
        let bot_id = self.ctx.cache.current_user().id.get();
        let server_count = self.ctx.cache.guilds().len();
        for listing in self.config.listings(bot_id) {
            match post_count(&self.client, &listing, server_count).await {
                Ok(()) => info!("Updated {} count", listing.name),
                Err(ListingError::InvalidToken) => error!("Invalid token"),
                Err(e) => error!("Failed to post request to {}: {}", listing.url, e),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use httpmock::Method::POST;
    use httpmock::MockServer;

    use super::*;

    fn client() -> wreq::Client {
        wreq::Client::builder().build().unwrap()
    }

    fn config(server: &MockServer) -> ListingsConfig {
        ListingsConfig {
            enabled: true,
            topgg_token: Some("topgg-token".to_string()),
            discordscom_token: Some(String::new()),
            topgg_url: Some(server.url("/api")),
            discordscom_url: None,
        }
    }

    #[test]
    fn test_listing_urls() {
        let config = ListingsConfig {
            enabled: true,
            topgg_token: Some("a".to_string()),
            discordscom_token: Some("b".to_string()),
            topgg_url: None,
            discordscom_url: None,
        };
        let listings = config.listings(42);
        assert_eq!(listings[0].url, "https://top.gg/api/bots/42/stats");
        assert_eq!(listings[1].url, "https://discords.com/bots/api/bot/42/setservers");
        assert_eq!(listings[1].token, "b");
    }

    #[tokio::test]
    async fn test_post_sends_count_with_token() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/api/bots/7/stats")
                .header("authorization", "topgg-token")
                .json_body(json!({ "server_count": 3 }));
            then.status(200);
        });

        let listings = config(&server).listings(7);
        assert_eq!(listings.len(), 1);
        post_count(&client(), &listings[0], 3).await.unwrap();
        mock.assert();
    }

    #[tokio::test]
    async fn test_unauthorized_is_invalid_token() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST);
            then.status(401);
        });

        let listings = config(&server).listings(7);
        let result = post_count(&client(), &listings[0], 3).await;
        assert!(matches!(result, Err(ListingError::InvalidToken)));
    }
}
