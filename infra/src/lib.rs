//! # Infrastructure Layer
//!
//! Concrete implementations of the OTP Gate ports defined in `otp_core`.
//!
//! ## Architecture
//!
//! The infrastructure layer contains:
//! - **Database**: MySQL implementation of the durable OTP repository using SQLx
//! - **Cache**: Redis client and the Redis-backed OTP cache
//! - **SMS**: SMS gateway integrations (Eskiz, console mock)
//! - **Bootstrap**: wiring of the above into a ready `OtpManager`

pub mod bootstrap;
pub mod cache;
pub mod database;
pub mod sms;

pub use bootstrap::{OtpInfrastructure, OtpService};

/// Configuration types used by this crate
pub mod config {
    pub use otp_shared::{AppConfig, CacheConfig, DatabaseConfig, OtpConfig, SmsConfig, SmsProvider};
}

/// Infrastructure-specific error types
#[derive(Debug, thiserror::Error)]
pub enum InfrastructureError {
    /// Database connection error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Redis cache error
    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    /// HTTP request error for external services
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Durable OTP store error
    #[error("OTP store error: {0}")]
    Store(#[from] otp_core::StoreError),

    /// Invalid application settings
    #[error(transparent)]
    InvalidSettings(#[from] otp_shared::ConfigError),

    /// SMS service error
    #[error("SMS service error: {0}")]
    Sms(String),
}
