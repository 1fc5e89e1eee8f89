//! # OTP Gate Core
//!
//! Core business logic for one-time-password phone verification.
//! This crate contains the OTP record entity, the canonical phone value
//! object, the durable repository interface, and the OTP services
//! (code generator, dual-path store, verifier and cleanup).

pub mod domain;
pub mod errors;
pub mod repositories;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::entities::OtpRecord;
pub use domain::value_objects::{normalize, CanonicalPhone};
pub use errors::{CacheError, OtpError, OtpResult, StoreError};
pub use repositories::{AttemptUpdate, InMemoryOtpRepository, OtpRepository, UpsertOutcome};
pub use services::otp::{
    generate, CleanupResult, DeliveryReport, DisabledCache, DualPathStore, IssuedCode, Lookup,
    OtpCache, OtpCleanupConfig, OtpCleanupService, OtpManager, RecordSource, SmsGateway,
    VerifyOutcome,
};
