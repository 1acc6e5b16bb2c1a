//! The built-in extensions loaded from the repository's extensions directory.

use std::path::PathBuf;
use std::sync::Arc;

use botkit::bot::BotSetup;
use botkit::bot::embed::style;
use botkit::cache::MemoryCache;
use botkit::config::Config;
use botkit::extension::ExtensionLoader;
use botkit::extension::ExtensionState;
use botkit::extension::HookBot;
use botkit::extension::patcher::run_patches;
use botkit::extensions::registry;
use botkit::web::WebApp;

fn extensions_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("extensions")
}

#[test]
fn test_default_states() {
    let loader = ExtensionLoader::new(extensions_dir(), registry());
    let mut config = Config::default();
    let loaded = loader.load(&mut config);

    for name in ["branding", "deabbreviator", "nice_errors", "ping"] {
        assert_eq!(loaded.state_of(name), Some(ExtensionState::Ready), "{name}");
    }
    for name in ["help", "listings", "status_post"] {
        assert_eq!(loaded.state_of(name), Some(ExtensionState::Disabled), "{name}");
    }
    assert_eq!(loaded.webserver.len(), 1);
    assert_eq!(loaded.startup.len(), 1);
}

#[tokio::test]
async fn test_setup_registers_localized_commands() {
    let loader = ExtensionLoader::new(extensions_dir(), registry());
    let mut config = Config::from_yaml_str("extensions:\n  help:\n    enabled: true\n").unwrap();
    let loaded = loader.load(&mut config);
    assert_eq!(loaded.state_of("help"), Some(ExtensionState::Ready));

    let mut setup = BotSetup::new(Arc::new(config), Arc::new(MemoryCache::new()));
    for hook in &loaded.setup {
        hook.invoke(Some(HookBot::Setup(&mut setup)), None)
            .await
            .unwrap_or_else(|e| panic!("{}: {e:?}", hook.extension()));
    }
    setup.finalize_commands(&loaded.translations);

    let names: Vec<&str> = setup.commands().iter().map(|c| c.name.as_str()).collect();
    for expected in ["ping", "deabbreviate", "help"] {
        assert!(names.contains(&expected), "missing {expected} in {names:?}");
    }

    let ping = setup.commands().iter().find(|c| c.name == "ping").unwrap();
    assert_eq!(ping.description.as_deref(), Some("Get the latency of the bot"));
    assert_eq!(
        ping.description_localizations.get("fr").map(String::as_str),
        Some("Obtenir la latence du bot")
    );

    let menu = setup
        .commands()
        .iter()
        .find(|c| c.context_menu_action.is_some())
        .unwrap();
    assert_eq!(menu.context_menu_name.as_deref(), Some("Deabbreviate message"));
}

#[tokio::test]
async fn test_startup_and_web_hooks_run_without_gateway() {
    let loader = ExtensionLoader::new(extensions_dir(), registry());
    let mut config = Config::default();
    let loaded = loader.load(&mut config);
    let app = WebApp::new();

    for hook in loaded.startup.iter().chain(&loaded.webserver) {
        hook.invoke(None, Some(&app)).await.unwrap();
    }
}

#[tokio::test]
async fn test_branding_patch_installs_embed_style() {
    let loader = ExtensionLoader::new(extensions_dir(), registry());
    let applied = run_patches(&loader, &Config::default()).await;

    // branding and nice_errors are enabled by default and both patch.
    assert_eq!(applied, 2);
    let style = style().unwrap();
    assert_eq!(style.color, Some(0x00FF00));
    assert_eq!(style.author.as_deref(), Some("Nice Bot"));
}
