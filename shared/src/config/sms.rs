//! SMS gateway configuration

use serde::{Deserialize, Serialize};

use super::env_or;
use crate::errors::ConfigError;

/// SMS provider selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SmsProvider {
    /// Logs messages instead of sending them (development)
    #[default]
    Mock,
    /// Eskiz.uz HTTP API
    Eskiz,
}

impl std::str::FromStr for SmsProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mock" => Ok(SmsProvider::Mock),
            "eskiz" => Ok(SmsProvider::Eskiz),
            _ => Err(format!("Unknown SMS provider: {}", s)),
        }
    }
}

/// SMS service configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct SmsConfig {
    /// SMS service provider
    pub provider: SmsProvider,
    /// API login (account email for Eskiz)
    pub api_key: String,
    /// API secret/password
    pub api_secret: String,
    /// Sender id or from number
    pub from_number: String,
    /// Override for the provider's API base URL
    #[serde(default)]
    pub base_url: Option<String>,
    /// Timeout for a single HTTP request in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl std::fmt::Debug for SmsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmsConfig")
            .field("provider", &self.provider)
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .field("from_number", &self.from_number)
            .field("base_url", &self.base_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl Default for SmsConfig {
    fn default() -> Self {
        Self {
            provider: SmsProvider::Mock,
            api_key: String::new(),
            api_secret: String::new(),
            from_number: String::from("4546"),
            base_url: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl SmsConfig {
    /// Create from environment variables
    ///
    /// A set but unknown `SMS_PROVIDER` or an unparsable timeout is rejected.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            provider: env_or("SMS_PROVIDER", SmsProvider::default())?,
            api_key: std::env::var("ESKIZ_EMAIL").unwrap_or_default(),
            api_secret: std::env::var("ESKIZ_PASSWORD").unwrap_or_default(),
            from_number: std::env::var("ESKIZ_SENDER").unwrap_or_else(|_| "4546".to_string()),
            base_url: std::env::var("ESKIZ_BASE_URL").ok().filter(|u| !u.is_empty()),
            request_timeout_secs: env_or(
                "SMS_REQUEST_TIMEOUT_SECS",
                default_request_timeout_secs(),
            )?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "SMS_REQUEST_TIMEOUT_SECS",
                "must be at least 1 second",
            ));
        }
        Ok(())
    }
}

fn default_request_timeout_secs() -> u64 {
    10
}
