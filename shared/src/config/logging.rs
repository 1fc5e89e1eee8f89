//! Logging configuration consumed by `crate::logging::init_tracing`

use serde::{Deserialize, Serialize};

use super::environment::Environment;

/// Output format of the tracing subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            _ => Err(format!("Invalid log format: {}", s)),
        }
    }
}

/// Tracing subscriber settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `otp_core=debug,sqlx=warn`
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,

    /// Include file and line in every event
    #[serde(default)]
    pub source_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::for_environment(Environment::default())
    }
}

impl LoggingConfig {
    /// Defaults for an environment: verbose and readable in development,
    /// JSON elsewhere so log shippers can parse the structured fields
    pub fn for_environment(env: Environment) -> Self {
        match env {
            Environment::Development => Self {
                level: String::from("debug,sqlx=warn"),
                format: LogFormat::Pretty,
                source_location: true,
            },
            Environment::Test => Self {
                level: String::from("info"),
                format: LogFormat::Compact,
                source_location: false,
            },
            Environment::Production => Self {
                level: String::from("info"),
                format: LogFormat::Json,
                source_location: false,
            },
        }
    }

    /// Environment defaults overridden by `LOG_LEVEL` / `LOG_FORMAT`
    pub fn from_env(env: Environment) -> Self {
        let mut config = Self::for_environment(env);
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            config.level = level;
        }
        if let Some(format) = std::env::var("LOG_FORMAT")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.format = format;
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_per_environment() {
        let dev = LoggingConfig::for_environment(Environment::Development);
        assert_eq!(dev.format, LogFormat::Pretty);
        assert!(dev.source_location);

        let prod = LoggingConfig::for_environment(Environment::Production);
        assert_eq!(prod.level, "info");
        assert_eq!(prod.format, LogFormat::Json);
    }

    #[test]
    fn test_log_format_parse() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("compact".parse::<LogFormat>().unwrap(), LogFormat::Compact);
        assert!("xml".parse::<LogFormat>().is_err());
    }
}
