//! Domain-specific error types and error handling.
//!
//! `OtpError` is what callers of the OTP manager see. `StoreError` and
//! `CacheError` are raised by the two storage tiers: cache errors are
//! absorbed by the dual-path store, store errors surface as
//! `OtpError::StorageUnavailable`. None of these carry a code value.

use thiserror::Error;

/// Caller-facing OTP errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OtpError {
    #[error("Invalid phone number format")]
    InvalidPhone,

    #[error("A code was sent recently. Please retry in {retry_after_seconds} seconds")]
    CooldownActive { retry_after_seconds: u64 },

    #[error("SMS delivery failed: {reason}")]
    DeliveryFailed { reason: String },

    #[error("OTP storage unavailable: {0}")]
    StorageUnavailable(#[from] StoreError),
}

/// Durable store failures. Always fatal for the current call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("durable store unavailable: {0}")]
    Unavailable(String),

    #[error("durable store call timed out after {0} ms")]
    Timeout(u64),

    #[error("corrupt OTP record: {0}")]
    Corrupt(String),
}

/// Volatile cache failures. Never fatal; the store falls back to the durable tier.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("cache unavailable: {0}")]
    Unavailable(String),

    #[error("cache call timed out after {0} ms")]
    Timeout(u64),

    #[error("cache serialization failed: {0}")]
    Serialization(String),
}

pub type OtpResult<T> = Result<T, OtpError>;
