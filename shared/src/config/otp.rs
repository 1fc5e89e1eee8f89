//! OTP issuance and verification configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::env_or;
use crate::errors::ConfigError;

/// Default number of digits in an issued code
pub const DEFAULT_CODE_LENGTH: usize = 6;

/// Default code lifetime (5 minutes)
pub const DEFAULT_CODE_TTL_SECONDS: i64 = 300;

/// Default minimum interval between two issuances for one phone
pub const DEFAULT_RESEND_COOLDOWN_SECONDS: i64 = 60;

/// Default failed verifications allowed per issued code
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default SMS body. `{code}` and `{minutes}` are substituted at send time.
pub const DEFAULT_MESSAGE_TEMPLATE: &str =
    "Your verification code is {code}. It expires in {minutes} minutes.";

const MIN_CODE_LENGTH: usize = 4;
const MAX_CODE_LENGTH: usize = 10;

/// Longest accepted code lifetime (one day)
pub const MAX_CODE_TTL_SECONDS: i64 = 86_400;

/// Longest accepted retention for expired records (30 days)
pub const MAX_SWEEP_RETENTION_SECONDS: i64 = 30 * 86_400;

/// Configuration for the OTP manager
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OtpConfig {
    /// Number of digits in an issued code
    pub code_length: usize,

    /// Seconds an issued code stays valid
    pub code_ttl_seconds: i64,

    /// Minimum seconds between two issuances for the same phone
    pub resend_cooldown_seconds: i64,

    /// Failed verifications allowed before the code is locked
    pub max_attempts: u32,

    /// Upper bound for a single cache call; exceeding it counts as a cache miss
    #[serde(default = "default_cache_timeout_ms")]
    pub cache_timeout_ms: u64,

    /// Upper bound for a single durable store call; exceeding it fails the operation
    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: u64,

    /// Upper bound for one SMS gateway call; exceeding it counts as a failed delivery
    #[serde(default = "default_sms_timeout_ms")]
    pub sms_timeout_ms: u64,

    /// SMS body template
    #[serde(default = "default_message_template")]
    pub message_template: String,

    /// How often the expired-record sweep runs
    #[serde(default = "default_sweep_interval_seconds")]
    pub sweep_interval_seconds: u64,

    /// How long expired records are kept before the sweep deletes them
    #[serde(default = "default_sweep_retention_seconds")]
    pub sweep_retention_seconds: i64,
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            code_length: DEFAULT_CODE_LENGTH,
            code_ttl_seconds: DEFAULT_CODE_TTL_SECONDS,
            resend_cooldown_seconds: DEFAULT_RESEND_COOLDOWN_SECONDS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            cache_timeout_ms: default_cache_timeout_ms(),
            store_timeout_ms: default_store_timeout_ms(),
            sms_timeout_ms: default_sms_timeout_ms(),
            message_template: default_message_template(),
            sweep_interval_seconds: default_sweep_interval_seconds(),
            sweep_retention_seconds: default_sweep_retention_seconds(),
        }
    }
}

impl OtpConfig {
    /// Load from `OTP_*` environment variables, falling back to defaults
    /// for unset keys. Set-but-unparsable values are rejected.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            code_length: env_or("OTP_CODE_LENGTH", defaults.code_length)?,
            code_ttl_seconds: env_or("OTP_CODE_TTL_SECONDS", defaults.code_ttl_seconds)?,
            resend_cooldown_seconds: env_or(
                "OTP_RESEND_COOLDOWN_SECONDS",
                defaults.resend_cooldown_seconds,
            )?,
            max_attempts: env_or("OTP_MAX_ATTEMPTS", defaults.max_attempts)?,
            cache_timeout_ms: env_or("OTP_CACHE_TIMEOUT_MS", defaults.cache_timeout_ms)?,
            store_timeout_ms: env_or("OTP_STORE_TIMEOUT_MS", defaults.store_timeout_ms)?,
            sms_timeout_ms: env_or("OTP_SMS_TIMEOUT_MS", defaults.sms_timeout_ms)?,
            message_template: std::env::var("OTP_MESSAGE_TEMPLATE")
                .unwrap_or(defaults.message_template),
            sweep_interval_seconds: env_or(
                "OTP_SWEEP_INTERVAL_SECONDS",
                defaults.sweep_interval_seconds,
            )?,
            sweep_retention_seconds: env_or(
                "OTP_SWEEP_RETENTION_SECONDS",
                defaults.sweep_retention_seconds,
            )?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the settings against the bounds the OTP manager relies on
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_CODE_LENGTH..=MAX_CODE_LENGTH).contains(&self.code_length) {
            return Err(ConfigError::invalid(
                "code_length",
                format!(
                    "must be between {} and {}, got {}",
                    MIN_CODE_LENGTH, MAX_CODE_LENGTH, self.code_length
                ),
            ));
        }
        if !(1..=MAX_CODE_TTL_SECONDS).contains(&self.code_ttl_seconds) {
            return Err(ConfigError::invalid(
                "code_ttl_seconds",
                format!(
                    "must be between 1 and {}, got {}",
                    MAX_CODE_TTL_SECONDS, self.code_ttl_seconds
                ),
            ));
        }
        if self.resend_cooldown_seconds < 0 {
            return Err(ConfigError::invalid(
                "resend_cooldown_seconds",
                "must not be negative",
            ));
        }
        // The cooldown is read from the stored record, which is deleted once expired.
        if self.resend_cooldown_seconds > self.code_ttl_seconds {
            return Err(ConfigError::invalid(
                "resend_cooldown_seconds",
                "must not exceed code_ttl_seconds",
            ));
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::invalid("max_attempts", "must be at least 1"));
        }
        if self.cache_timeout_ms == 0 || self.store_timeout_ms == 0 || self.sms_timeout_ms == 0 {
            return Err(ConfigError::invalid("timeouts", "must be positive"));
        }
        if !self.message_template.contains("{code}") {
            return Err(ConfigError::invalid(
                "message_template",
                "must contain the {code} placeholder",
            ));
        }
        if !(0..=MAX_SWEEP_RETENTION_SECONDS).contains(&self.sweep_retention_seconds) {
            return Err(ConfigError::invalid(
                "sweep_retention_seconds",
                format!("must be between 0 and {}", MAX_SWEEP_RETENTION_SECONDS),
            ));
        }
        Ok(())
    }

    /// Set the code length
    pub fn with_code_length(mut self, length: usize) -> Self {
        self.code_length = length;
        self
    }

    /// Set the code lifetime in seconds
    pub fn with_code_ttl_seconds(mut self, seconds: i64) -> Self {
        self.code_ttl_seconds = seconds;
        self
    }

    /// Set the resend cooldown in seconds
    pub fn with_resend_cooldown_seconds(mut self, seconds: i64) -> Self {
        self.resend_cooldown_seconds = seconds;
        self
    }

    /// Set the maximum failed attempts per code
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn cache_timeout(&self) -> Duration {
        Duration::from_millis(self.cache_timeout_ms)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn sms_timeout(&self) -> Duration {
        Duration::from_millis(self.sms_timeout_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds)
    }

    /// Render the SMS body for a code
    pub fn render_message(&self, code: &str) -> String {
        let minutes = (self.code_ttl_seconds + 59) / 60;
        self.message_template
            .replace("{code}", code)
            .replace("{minutes}", &minutes.to_string())
    }
}

fn default_cache_timeout_ms() -> u64 {
    250
}

fn default_store_timeout_ms() -> u64 {
    2_000
}

fn default_sms_timeout_ms() -> u64 {
    10_000
}

fn default_message_template() -> String {
    DEFAULT_MESSAGE_TEMPLATE.to_string()
}

fn default_sweep_interval_seconds() -> u64 {
    600
}

fn default_sweep_retention_seconds() -> i64 {
    3_600
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = OtpConfig::default();
        assert_eq!(config.code_length, 6);
        assert_eq!(config.code_ttl_seconds, 300);
        assert_eq!(config.resend_cooldown_seconds, 60);
        assert_eq!(config.max_attempts, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_code_length() {
        assert!(OtpConfig::default().with_code_length(0).validate().is_err());
        assert!(OtpConfig::default().with_code_length(3).validate().is_err());
        assert!(OtpConfig::default().with_code_length(11).validate().is_err());
        assert!(OtpConfig::default().with_code_length(8).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_attempts() {
        let err = OtpConfig::default().with_max_attempts(0).validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "max_attempts"));
    }

    #[test]
    fn test_validate_bounds_code_ttl() {
        for ttl in [0, -1, MAX_CODE_TTL_SECONDS + 1, i64::MAX] {
            let err = OtpConfig::default().with_code_ttl_seconds(ttl).validate().unwrap_err();
            assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "code_ttl_seconds"));
        }
        let longest = OtpConfig::default().with_code_ttl_seconds(MAX_CODE_TTL_SECONDS);
        assert!(longest.validate().is_ok());
        assert!(longest.render_message("1").ends_with("1440 minutes."));
    }

    #[test]
    fn test_validate_bounds_sweep_retention() {
        let config = OtpConfig {
            sweep_retention_seconds: i64::MAX,
            ..OtpConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_cooldown_longer_than_ttl() {
        let config = OtpConfig::default()
            .with_code_ttl_seconds(30)
            .with_resend_cooldown_seconds(60);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_template_without_code() {
        let config = OtpConfig {
            message_template: "Hello".to_string(),
            ..OtpConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_render_message() {
        let config = OtpConfig::default();
        assert_eq!(
            config.render_message("012345"),
            "Your verification code is 012345. It expires in 5 minutes."
        );

        let config = OtpConfig::default().with_code_ttl_seconds(90);
        assert!(config.render_message("1").ends_with("2 minutes."));
    }

    #[test]
    fn test_timeouts() {
        let config = OtpConfig::default();
        assert_eq!(config.cache_timeout(), Duration::from_millis(250));
        assert_eq!(config.store_timeout(), Duration::from_secs(2));
        assert_eq!(config.sms_timeout(), Duration::from_secs(10));
    }
}
