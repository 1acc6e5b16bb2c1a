//! Discord bot built on poise: shared data, setup by extensions and the client run loop.

pub mod checks;
pub mod commands;
pub mod embed;
pub mod error;
pub mod error_handler;
pub mod pagination;
pub mod translations;

use std::any::Any;
use std::any::TypeId;
use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::OnceLock;
use std::time::Duration;
use std::time::Instant;

use anyhow::Result;
use async_trait::async_trait;
use log::error;
use log::info;
use poise::Command;
use poise::FrameworkOptions;
use poise::serenity_prelude as serenity;

pub use crate::bot::translations::translations;

use crate::bot::checks::Invocation;
use crate::bot::commands::Cog;
use crate::bot::error_handler::ErrorHandler;
use crate::bot::error_handler::ErrorResponder;
use crate::cache::Cache;
use crate::config::Config;
use crate::cooldown::Cooldown;
use crate::cooldown::CooldownEngine;
use crate::error::AppError;
use crate::i18n::ExtensionTranslation;
use crate::i18n::Locale;
use crate::i18n::localize;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;

/// Data shared across bot commands and contexts.
pub struct Data {
    pub config: Arc<Config>,
    pub cache: Arc<dyn Cache>,
    pub cooldowns: CooldownEngine,
    /// Cooldowns by the identifying name of the command they guard.
    pub command_cooldowns: HashMap<String, Cooldown<Data, Invocation>>,
    pub responders: Vec<Arc<dyn ErrorResponder>>,
    pub listeners: Vec<Arc<dyn Listener>>,
    states: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
    shard_manager: OnceLock<Arc<serenity::ShardManager>>,
    pub start_time: Instant,
}

impl Data {
    /// State an extension stored with [`BotSetup::add_state`].
    pub fn state<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.states
            .get(&TypeId::of::<T>())
            .and_then(|state| state.downcast_ref::<T>())
    }

    /// Set once the first gateway event arrives.
    pub fn shard_manager(&self) -> Option<Arc<serenity::ShardManager>> {
        self.shard_manager.get().cloned()
    }
}

/// Heartbeat latency of `shard`, once the gateway has measured one.
pub async fn shard_latency(
    manager: &serenity::ShardManager,
    shard: serenity::ShardId,
) -> Option<Duration> {
    manager.runners.lock().await.get(&shard)?.latency
}

/// Receives every gateway event.
#[async_trait]
pub trait Listener: Send + Sync {
    async fn on_event(
        &self,
        ctx: &serenity::Context,
        event: &serenity::FullEvent,
        data: &Data,
    ) -> anyhow::Result<()>;
}

/// What `setup` hooks add to the bot before it starts.
pub struct BotSetup {
    config: Arc<Config>,
    cache: Arc<dyn Cache>,
    commands: Vec<Command<Data, Error>>,
    cooldowns: HashMap<String, Cooldown<Data, Invocation>>,
    responders: Vec<Arc<dyn ErrorResponder>>,
    listeners: Vec<Arc<dyn Listener>>,
    states: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl BotSetup {
    pub fn new(config: Arc<Config>, cache: Arc<dyn Cache>) -> Self {
        Self {
            config,
            cache,
            commands: Vec::new(),
            cooldowns: HashMap::new(),
            responders: Vec::new(),
            listeners: Vec::new(),
            states: HashMap::new(),
        }
    }

    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    pub fn cache(&self) -> &Arc<dyn Cache> {
        &self.cache
    }

    pub fn add_cog(&mut self, cog: impl Cog) -> &mut Self {
        self.commands.extend(cog.commands());
        self
    }

    pub fn add_command(&mut self, command: Command<Data, Error>) -> &mut Self {
        self.commands.push(command);
        self
    }

    /// Guards the command whose identifying name is `command` with `cooldown`.
    pub fn add_cooldown(
        &mut self,
        command: impl Into<String>,
        cooldown: Cooldown<Data, Invocation>,
    ) -> &mut Self {
        self.cooldowns.insert(command.into(), cooldown);
        self
    }

    pub fn add_listener(&mut self, listener: impl Listener + 'static) -> &mut Self {
        self.listeners.push(Arc::new(listener));
        self
    }

    /// Responders are asked in the order they were added.
    pub fn add_error_responder(&mut self, responder: impl ErrorResponder + 'static) -> &mut Self {
        self.responders.push(Arc::new(responder));
        self
    }

    /// Stores state commands can read back through [`Data::state`], one value per type.
    pub fn add_state<T: Any + Send + Sync>(&mut self, state: T) -> &mut Self {
        self.states.insert(TypeId::of::<T>(), Arc::new(state));
        self
    }

    pub fn commands(&self) -> &[Command<Data, Error>] {
        &self.commands
    }

    /// Localizes the commands, then strips the invocation styles the configuration disables.
    pub fn finalize_commands(&mut self, translations: &[ExtensionTranslation]) {
        localize::apply(&mut self.commands, translations, Locale::default());
        let prefix = self.config.bot.prefix.enabled;
        let slash = self.config.bot.slash.enabled;
        for command in &mut self.commands {
            strip_disabled(command, prefix, slash);
        }
    }
}

fn strip_disabled(command: &mut Command<Data, Error>, prefix: bool, slash: bool) {
    if !prefix {
        command.prefix_action = None;
    }
    if !slash {
        command.slash_action = None;
        command.context_menu_action = None;
    }
    for sub in &mut command.subcommands {
        strip_disabled(sub, prefix, slash);
    }
}

/// Gateway intents for the configuration. Reading prefix commands needs message content.
pub fn intents(config: &Config) -> serenity::GatewayIntents {
    let intents = serenity::GatewayIntents::non_privileged();
    if config.bot.prefix.enabled {
        intents | serenity::GatewayIntents::MESSAGE_CONTENT
    } else {
        intents
    }
}

/// Discord bot client and framework.
pub struct Bot;

impl Bot {
    /// Builds the framework from `setup` and runs the client until it stops.
    pub async fn run(setup: BotSetup) -> Result<()> {
        info!("Initializing bot...");
        let BotSetup {
            config,
            cache,
            commands,
            cooldowns,
            responders,
            listeners,
            states,
        } = setup;
        let token = config.bot.token.clone().ok_or(AppError::MissingConfig {
            key: "bot.token".to_string(),
        })?;

        let data = Data {
            config: config.clone(),
            cooldowns: CooldownEngine::new(cache.clone()),
            cache,
            command_cooldowns: cooldowns,
            responders,
            listeners,
            states,
            shard_manager: OnceLock::new(),
            start_time: Instant::now(),
        };
        let framework = Self::create_framework(&config, commands, data);

        let mut client = serenity::ClientBuilder::new(token, intents(&config))
            .framework(framework)
            .await?;
        info!("Connecting bot to Discord...");
        client.start().await?;
        Ok(())
    }

    /// Creates the poise framework with commands and configuration.
    fn create_framework(
        config: &Config,
        commands: Vec<Command<Data, Error>>,
        data: Data,
    ) -> poise::Framework<Data, Error> {
        let register = config.bot.slash.enabled;
        let options = FrameworkOptions::<Data, Error> {
            commands,
            on_error: |error| Box::pin(ErrorHandler::handle(error)),
            command_check: Some(|ctx| Box::pin(checks::cooldown_check(ctx))),
            event_handler: |ctx, event, framework, data| {
                let _ = data.shard_manager.set(framework.shard_manager.clone());
                Box::pin(Self::dispatch(ctx, event, data))
            },
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: config.bot.prefix.prefix.clone(),
                mention_as_prefix: true,
                edit_tracker: Some(Arc::new(poise::EditTracker::for_timespan(
                    Duration::from_secs(3600),
                ))),
                ..Default::default()
            },
            owners: config
                .bot
                .owners
                .iter()
                .map(|id| serenity::UserId::new(*id))
                .collect::<HashSet<_>>(),
            ..Default::default()
        };

        poise::Framework::builder()
            .options(options)
            .setup(move |ctx, ready, framework| {
                Box::pin(async move {
                    if register {
                        poise::builtins::register_globally(ctx, &framework.options().commands)
                            .await?;
                    }
                    info!("Bot started successfully as {}", ready.user.name);
                    Ok(data)
                })
            })
            .build()
    }

    /// Hands a gateway event to every listener. A failing listener does not stop the others.
    async fn dispatch(
        ctx: &serenity::Context,
        event: &serenity::FullEvent,
        data: &Data,
    ) -> Result<(), Error> {
        for listener in &data.listeners {
            if let Err(e) = listener.on_event(ctx, event, data).await {
                error!("Listener failed: {:?}", e);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;

    #[poise::command(slash_command, prefix_command, subcommands("child"))]
    async fn parent(_ctx: Context<'_>) -> Result<(), Error> {
        Ok(())
    }

    #[poise::command(slash_command, prefix_command)]
    async fn child(_ctx: Context<'_>) -> Result<(), Error> {
        Ok(())
    }

    fn setup(yaml: &str) -> BotSetup {
        let config = Arc::new(Config::from_yaml_str(yaml).unwrap());
        BotSetup::new(config, Arc::new(MemoryCache::new()))
    }

    #[test]
    fn test_disabled_prefix_strips_prefix_actions() {
        let mut setup = setup("bot:\n  prefix:\n    enabled: false\n");
        setup.add_command(parent());
        setup.finalize_commands(&[]);

        let command = &setup.commands()[0];
        assert!(command.prefix_action.is_none());
        assert!(command.slash_action.is_some());
        assert!(command.subcommands[0].prefix_action.is_none());
    }

    #[test]
    fn test_disabled_slash_strips_slash_actions() {
        let mut setup = setup("bot:\n  slash:\n    enabled: false\n");
        setup.add_command(child());
        setup.finalize_commands(&[]);

        let command = &setup.commands()[0];
        assert!(command.slash_action.is_none());
        assert!(command.prefix_action.is_some());
    }

    #[test]
    fn test_state_is_keyed_by_type() {
        struct Pages(usize);

        let mut setup = setup("{}");
        setup.add_state(Pages(3));
        assert_eq!(setup.states.len(), 1);
        let state = setup.states[&TypeId::of::<Pages>()].clone();
        assert_eq!(state.downcast_ref::<Pages>().map(|p| p.0), Some(3));
    }

    #[test]
    fn test_message_content_only_with_prefix() {
        let with_prefix = Config::from_yaml_str("{}").unwrap();
        assert!(intents(&with_prefix).contains(serenity::GatewayIntents::MESSAGE_CONTENT));

        let without = Config::from_yaml_str("bot:\n  prefix:\n    enabled: false\n").unwrap();
        assert!(!intents(&without).contains(serenity::GatewayIntents::MESSAGE_CONTENT));
    }
}
