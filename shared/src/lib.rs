//! Shared utilities and common types for the OTP Gate workspace
//!
//! This crate provides functionality used by both the core and infra crates:
//! - Configuration types loaded from the environment
//! - Phone number helpers (normalization, masking)
//! - Logging initialization

pub mod config;
pub mod errors;
pub mod logging;
pub mod utils;

// Re-export commonly used items at crate root
pub use config::{
    AppConfig, CacheConfig, DatabaseConfig, Environment, LogFormat, LoggingConfig, OtpConfig,
    SmsConfig, SmsProvider,
};
pub use errors::ConfigError;
pub use utils::phone;
