//! Configuration module with business-specific sub-modules
//!
//! This module organizes configuration into logical areas:
//! - `cache` - Redis configuration for the volatile tier
//! - `database` - Database connection and pool configuration
//! - `environment` - Deployment environment detection
//! - `logging` - Tracing subscriber settings
//! - `otp` - Code issuance, verification and sweep settings
//! - `sms` - SMS gateway selection and credentials

pub mod cache;
pub mod database;
pub mod environment;
pub mod logging;
pub mod otp;
pub mod sms;

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::errors::ConfigError;

// Re-export commonly used types
pub use cache::CacheConfig;
pub use database::DatabaseConfig;
pub use environment::Environment;
pub use logging::{LogFormat, LoggingConfig};
pub use otp::OtpConfig;
pub use sms::{SmsConfig, SmsProvider};

/// Complete application configuration combining all sub-configurations
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Environment configuration
    pub environment: Environment,

    /// Durable store configuration
    pub database: DatabaseConfig,

    /// Volatile cache configuration
    pub cache: CacheConfig,

    /// OTP manager configuration
    pub otp: OtpConfig,

    /// SMS gateway configuration
    pub sms: SmsConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        let env = Environment::default();
        Self {
            environment: env,
            database: DatabaseConfig::default(),
            cache: CacheConfig::default(),
            otp: OtpConfig::default(),
            sms: SmsConfig::default(),
            logging: LoggingConfig::for_environment(env),
        }
    }
}

impl AppConfig {
    /// Create configuration for development environment
    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig::new("mysql://localhost:3306/otp_gate_dev"),
            logging: LoggingConfig::for_environment(Environment::Development),
            ..Default::default()
        }
    }

    /// Create configuration for production environment
    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig::new("mysql://prod-db:3306/otp_gate").with_max_connections(50),
            logging: LoggingConfig::for_environment(Environment::Production),
            ..Default::default()
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = Environment::from_env();
        let config = Self {
            environment,
            database: DatabaseConfig::from_env()?,
            cache: CacheConfig::from_env()?,
            otp: OtpConfig::from_env()?,
            sms: SmsConfig::from_env()?,
            logging: LoggingConfig::from_env(environment),
        };

        if !config.environment.allows_mock_sms() && config.sms.provider == SmsProvider::Mock {
            return Err(ConfigError::invalid(
                "SMS_PROVIDER",
                "the mock gateway is not allowed in production",
            ));
        }

        Ok(config)
    }
}

/// Parse `key` from the environment, or `default` when unset.
/// A set but unparsable value is an error rather than a silent default.
pub(crate) fn env_or<T: FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::invalid(key, format!("cannot parse '{}'", raw))),
        Err(_) => Ok(default),
    }
}

/// Boolean switch accepting `1/0`, `true/false`, `yes/no`, `on/off`
pub(crate) fn env_flag(key: &str, default: bool) -> Result<bool, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => match raw.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::invalid(key, format!("expected a boolean, got '{}'", raw))),
        },
        Err(_) => Ok(default),
    }
}
