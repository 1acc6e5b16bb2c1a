//! Application-level errors.

use log::error;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum AppError {
    #[error("Configuration error: {msg}")]
    ConfigurationError { msg: String },

    #[error("Missing config with key \"{key}\"")]
    MissingConfig { key: String },

    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Logs an unexpected error under a fresh reference id and returns the id.
    ///
    /// The id is shown to users so that a report can be matched with the log line.
    pub fn log_with_ref<E: std::fmt::Debug + ?Sized>(err: &E) -> Uuid {
        let ref_id = Uuid::new_v4();
        error!("[ref {}] {:?}", ref_id, err);
        ref_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_with_ref_returns_unique_ids() {
        let err = AppError::MissingConfig {
            key: "bot.token".to_string(),
        };
        let first = AppError::log_with_ref(&err);
        let second = AppError::log_with_ref(&err);
        assert_ne!(first, second);
    }

    #[test]
    fn test_missing_config_message() {
        let err = AppError::MissingConfig {
            key: "bot.token".to_string(),
        };
        assert_eq!(err.to_string(), "Missing config with key \"bot.token\"");
    }
}
