//! Logging setup and configuration.

use tracing_appender::rolling::RollingFileAppender;
use tracing_appender::rolling::Rotation;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::Config;
use crate::error::AppError;

const DEFAULT_FILTER: &str = "botkit=info";

/// Sets up logging with both console and file output.
///
/// `log` macros used throughout the crate are bridged into the tracing subscriber.
pub fn setup_logging(config: &Config) -> Result<(), AppError> {
    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("botkit")
        .filename_suffix("log")
        .max_log_files(7)
        .build(&config.logs.path)
        .map_err(|e| AppError::ConfigurationError {
            msg: format!(
                "Failed to initialize rolling file appender at '{}': {}",
                config.logs.path.to_string_lossy(),
                e
            ),
        })?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // Leak the guard to prevent it from being dropped
    std::mem::forget(guard);

    tracing_subscriber::registry()
        .with(env_filter(config)?)
        .with(fmt::layer().with_writer(std::io::stdout).with_ansi(true))
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .try_init()
        .map_err(|e| AppError::ConfigurationError {
            msg: format!("Failed to install logger: {e}"),
        })?;

    Ok(())
}

/// Configured filter first, then `RUST_LOG`, then the crate default.
fn env_filter(config: &Config) -> Result<EnvFilter, AppError> {
    match &config.logs.filter {
        Some(directives) => {
            EnvFilter::try_new(directives).map_err(|e| AppError::ConfigurationError {
                msg: format!("Invalid log filter '{directives}': {e}"),
            })
        }
        None => {
            Ok(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)))
        }
    }
}
