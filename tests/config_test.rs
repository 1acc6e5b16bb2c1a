//! Loading the configuration from the working directory or the environment.

use std::path::PathBuf;

use botkit::config::Config;
use serde_json::json;
use tempfile::TempDir;

mod common;

/// Runs `f` with the working directory set to a fresh temp dir, restoring it afterwards.
fn in_temp_dir<T>(f: impl FnOnce(&TempDir) -> T) -> T {
    let original: PathBuf = std::env::current_dir().unwrap();
    let dir = TempDir::new().unwrap();
    std::env::set_current_dir(dir.path()).unwrap();
    let result = f(&dir);
    std::env::set_current_dir(original).unwrap();
    result
}

#[test]
#[serial_test::serial]
fn test_config_yaml_wins_over_yml() {
    let config = in_temp_dir(|dir| {
        common::write_file(dir.path(), "config.yml", "web:\n  bind: \"127.0.0.1:1\"\n");
        common::write_file(dir.path(), "config.yaml", "web:\n  bind: \"127.0.0.1:2\"\n");
        Config::load().unwrap()
    });
    assert_eq!(config.web.bind, "127.0.0.1:2");
}

#[test]
#[serial_test::serial]
fn test_environment_is_read_without_config_file() {
    // SAFETY: serial tests are the only ones touching the process environment.
    unsafe {
        std::env::set_var("BOTKIT__BOT__TOKEN", "from-env");
        std::env::set_var("BOTKIT__EXTENSIONS__PING__ENABLED", "False");
    }
    let config = in_temp_dir(|_| Config::load());
    unsafe {
        std::env::remove_var("BOTKIT__BOT__TOKEN");
        std::env::remove_var("BOTKIT__EXTENSIONS__PING__ENABLED");
    }

    let config = config.unwrap();
    assert_eq!(config.bot.token.as_deref(), Some("from-env"));
    assert_eq!(config.extension("ping"), Some(&json!({ "enabled": false })));
}

#[test]
#[serial_test::serial]
fn test_example_config_parses() {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config.example.yaml");
    let config = Config::from_yaml_file(&path).unwrap();
    assert!(config.bot.prefix.enabled);
    assert_eq!(config.bot.prefix.prefix.as_deref(), Some("!"));
    assert_eq!(config.extension("status_post").unwrap()["every"], json!(60));
}
