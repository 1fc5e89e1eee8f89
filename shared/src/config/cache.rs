//! Redis settings for the volatile OTP tier

use serde::{Deserialize, Serialize};

use super::{env_flag, env_or};
use crate::errors::ConfigError;

/// Redis connection settings
///
/// With `enabled = false` the OTP store runs on MySQL alone.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// `redis://[user:pass@]host:port[/db]`
    pub url: String,

    /// Seconds allowed for one connection attempt
    pub connection_timeout: u64,

    /// Connection attempts at startup before giving up
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial backoff between connection attempts, doubled each retry
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Namespace prepended to every key, e.g. to share one Redis between deployments
    #[serde(default)]
    pub key_prefix: Option<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            url: String::from("redis://localhost:6379"),
            connection_timeout: 2,
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            key_prefix: None,
        }
    }
}

impl CacheConfig {
    /// `REDIS_*` variables over the defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            enabled: env_flag("REDIS_ENABLED", defaults.enabled)?,
            url: std::env::var("REDIS_URL").unwrap_or(defaults.url),
            connection_timeout: env_or("REDIS_CONNECT_TIMEOUT", defaults.connection_timeout)?,
            max_retries: env_or("REDIS_MAX_RETRIES", defaults.max_retries)?,
            retry_delay_ms: env_or("REDIS_RETRY_DELAY_MS", defaults.retry_delay_ms)?,
            key_prefix: std::env::var("REDIS_KEY_PREFIX")
                .ok()
                .filter(|p| !p.is_empty()),
        })
    }

    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    /// `prefix:key`, or `key` when no prefix is configured
    pub fn make_key(&self, key: &str) -> String {
        match &self.key_prefix {
            Some(prefix) => format!("{}:{}", prefix, key),
            None => key.to_string(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    100
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CacheConfig::default();
        assert!(config.enabled);
        assert_eq!(config.url, "redis://localhost:6379");
        assert_eq!(config.max_retries, 3);
        assert!(config.key_prefix.is_none());
    }

    #[test]
    fn test_prefixed_keys() {
        let config = CacheConfig::new("redis://cache:6379").with_prefix("otpgate");
        assert_eq!(config.make_key("otp:record:+998901234567"), "otpgate:otp:record:+998901234567");
        assert_eq!(
            CacheConfig::default().make_key("otp:record:+998901234567"),
            "otp:record:+998901234567"
        );
    }
}
