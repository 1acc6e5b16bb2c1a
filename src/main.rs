//! Application entry point for botkit.
//!
//! Applies extension patches, loads extensions and runs the bot and web server.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use botkit::bot::Bot;
use botkit::bot::BotSetup;
use botkit::cache;
use botkit::config::Config;
use botkit::extension::BoundHook;
use botkit::extension::ExtensionLoader;
use botkit::extension::HookBot;
use botkit::extension::LoadedExtensions;
use botkit::extension::patcher::run_patches;
use botkit::extensions::registry;
use botkit::logging::setup_logging;
use botkit::web;
use botkit::web::WebApp;
use botkit::web::WebBot;
use dotenv::dotenv;
use futures::future::join_all;
use log::debug;
use log::error;
use log::info;

const EXTENSIONS_DIR: &str = "extensions";

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let init_start = Instant::now();
    let mut config = load_config()?;

    let loader = ExtensionLoader::new(EXTENSIONS_DIR, registry());
    let patched = run_patches(&loader, &config).await;
    debug!(
        "Applied {} patches ({:.2}s).",
        patched,
        init_start.elapsed().as_secs_f64()
    );

    let Some(token) = config.bot.token.clone().filter(|t| !t.is_empty()) else {
        error!("No bot token provided in config, exiting...");
        return Ok(());
    };

    let loaded = loader.load(&mut config);
    info!(
        "Extensions loaded: [{}] ({:.2}s).",
        loaded.ready().collect::<Vec<_>>().join(", "),
        init_start.elapsed().as_secs_f64()
    );
    let config = Arc::new(config);

    let run_bot = config.r#use.bot && !loaded.setup.is_empty();
    let run_backend = config.r#use.backend && !loaded.webserver.is_empty();
    if !run_bot && !run_backend {
        error!("No extensions to run, exiting...");
        return Ok(());
    }

    let backend = run_backend.then(|| (WebApp::new(), web::rest_bot(&token)));
    run_startup_hooks(&loaded.startup, backend.as_ref()).await;

    let bot = if run_bot {
        Some(setup_bot(&config, &loaded).await)
    } else {
        None
    };
    let app = match backend {
        Some((app, rest)) => {
            setup_backend(&loaded.webserver, &app, &rest).await;
            Some(app)
        }
        None => None,
    };

    run(bot, app, &config.web.bind, init_start).await
}

fn load_config() -> Result<Config> {
    let config = Config::load()?;
    setup_logging(&config)?;
    info!("Starting botkit...");
    Ok(config)
}

/// Runs every startup hook concurrently. A failing hook is logged.
async fn run_startup_hooks(hooks: &[BoundHook], backend: Option<&(WebApp, WebBot)>) {
    if hooks.is_empty() {
        return;
    }
    debug!("Running {} startup hooks...", hooks.len());
    let runs = hooks.iter().map(|hook| async move {
        let bot = backend.map(|(_, rest)| HookBot::Rest(rest));
        let app = backend.map(|(app, _)| app);
        if let Err(e) = hook.invoke(bot, app).await {
            error!("Startup hook of extension {} failed: {:?}", hook.extension(), e);
        }
    });
    join_all(runs).await;
}

async fn setup_bot(config: &Arc<Config>, loaded: &LoadedExtensions) -> BotSetup {
    debug!("Setting up bot...");
    let mut setup = BotSetup::new(config.clone(), cache::from_config(&config.bot.cache));
    for hook in &loaded.setup {
        if let Err(e) = hook.invoke(Some(HookBot::Setup(&mut setup)), None).await {
            error!("Setup of extension {} failed: {:?}", hook.extension(), e);
        }
    }
    setup.finalize_commands(&loaded.translations);
    info!("Bot set up with {} commands.", setup.commands().len());
    setup
}

async fn setup_backend(hooks: &[BoundHook], app: &WebApp, rest: &WebBot) {
    debug!("Setting up web server...");
    for hook in hooks {
        if let Err(e) = hook.invoke(Some(HookBot::Rest(rest)), Some(app)).await {
            error!("Web setup of extension {} failed: {:?}", hook.extension(), e);
        }
    }
}

/// Runs the bot and the web server side by side until both stop or Ctrl+C.
async fn run(bot: Option<BotSetup>, app: Option<WebApp>, bind: &str, init_start: Instant) -> Result<()> {
    let bot_run = async {
        if let Some(setup) = bot
            && let Err(e) = Bot::run(setup).await
        {
            error!("An unexpected error occurred while running the bot: {:?}", e);
        }
    };
    let web_run = async {
        if let Some(app) = &app
            && let Err(e) = web::serve(app, bind).await
        {
            error!("An error occurred while running the web server: {:?}", e);
        }
    };

    info!(
        "botkit is up in {:.2}s. Press Ctrl+C to stop.",
        init_start.elapsed().as_secs_f64()
    );
    tokio::select! {
        _ = async { tokio::join!(bot_run, web_run) } => {
            info!("Bot and web server stopped.");
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            info!("Ctrl+C received, shutting down.");
        }
    }
    Ok(())
}
