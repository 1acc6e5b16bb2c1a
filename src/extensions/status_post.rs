//! Pushes the gateway latency to an uptime monitor.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;

use anyhow::bail;
use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;
use log::debug;
use log::info;
use poise::serenity_prelude as serenity;
use serde::Deserialize;
use serde_json::Value;
use serde_json::json;

use crate::bot::Data;
use crate::bot::Listener;
use crate::bot::shard_latency;
use crate::extension::ExtensionModule;
use crate::extension::Hook;
use crate::extension::HookArgs;
use crate::extension::HookParam;
use crate::extension::Schema;
use crate::task::Looper;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StatusPostConfig {
    pub enabled: bool,
    pub url: String,
    pub every: u64,
}

/// GETs `url` with the latency in milliseconds appended.
#[derive(Clone)]
pub struct StatusPush {
    client: wreq::Client,
    url: String,
}

impl StatusPush {
    pub fn new(url: impl Into<String>) -> anyhow::Result<Self> {
        Ok(Self {
            client: wreq::Client::builder().build()?,
            url: url.into(),
        })
    }

    pub async fn push(&self, latency_ms: u128) -> anyhow::Result<()> {
        let url = format!("{}{}", self.url, latency_ms);
        debug!("Pushing status to {}", url);
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            bail!("status endpoint answered {}", status);
        }
        Ok(())
    }
}

pub struct StatusPost;

impl ExtensionModule for StatusPost {
    fn name(&self) -> &'static str {
        "status_post"
    }

    fn default_config(&self) -> Option<Value> {
        Some(json!({ "enabled": false, "url": "", "every": 60 }))
    }

    fn schema(&self) -> Option<Schema> {
        Some(Schema::of_with::<StatusPostConfig, _>(|config| {
            if config.every == 0 {
                return Err("every must be positive".to_string());
            }
            Ok(())
        }))
    }

    fn hooks(&self) -> Vec<Hook> {
        vec![Hook::setup(&[HookParam::Bot, HookParam::Config], setup)]
    }
}

fn setup(mut args: HookArgs<'_>) -> BoxFuture<'_, anyhow::Result<()>> {
    async move {
        let config: StatusPostConfig = args.config()?.parse()?;
        args.bot_setup()?.add_listener(StartOnReady {
            push: StatusPush::new(config.url)?,
            every: Duration::from_secs(config.every),
            started: AtomicBool::new(false),
        });
        Ok(())
    }
    .boxed()
}

struct StartOnReady {
    push: StatusPush,
    every: Duration,
    started: AtomicBool,
}

#[async_trait]
impl Listener for StartOnReady {
    async fn on_event(
        &self,
        ctx: &serenity::Context,
        event: &serenity::FullEvent,
        data: &Data,
    ) -> anyhow::Result<()> {
        if let serenity::FullEvent::Ready { .. } = event
            && !self.started.swap(true, Ordering::SeqCst)
        {
            Arc::new(StatusLoop {
                push: self.push.clone(),
                every: self.every,
                shard: ctx.shard_id,
                shard_manager: data.shard_manager(),
            })
            .spawn();
        }
        Ok(())
    }
}

struct StatusLoop {
    push: StatusPush,
    every: Duration,
    shard: serenity::ShardId,
    shard_manager: Option<Arc<serenity::ShardManager>>,
}

#[async_trait]
impl Looper for StatusLoop {
    fn name(&self) -> &str {
        "Status post"
    }

    fn interval(&self) -> Duration {
        self.every
    }

    async fn loop_func(&self) -> anyhow::Result<()> {
        let latency = match &self.shard_manager {
            Some(manager) => shard_latency(manager, self.shard).await,
            None => None,
        };
        self.push
            .push(latency.map(|l| l.as_millis()).unwrap_or_default())
            .await?;
        info!("Pushed status.");
        Ok(())
    }
}
