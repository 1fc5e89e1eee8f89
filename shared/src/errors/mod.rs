//! Shared error types

use thiserror::Error;

/// Errors raised while loading or validating configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Logging initialization failed: {0}")]
    Logging(String),
}

impl ConfigError {
    /// Shorthand for an invalid value error
    pub fn invalid(key: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            key: key.into(),
            message: message.into(),
        }
    }
}
