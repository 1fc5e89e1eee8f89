//! Tracing subscriber setup shared by the workspace binaries

use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, LoggingConfig};
use crate::errors::ConfigError;

/// Install the global tracing subscriber
///
/// `RUST_LOG` takes precedence over `LoggingConfig::level` when set.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), ConfigError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| ConfigError::Logging(e.to_string()))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(config.source_location)
        .with_line_number(config.source_location);

    let result = match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
    };

    result.map_err(|e| ConfigError::Logging(e.to_string()))
}
