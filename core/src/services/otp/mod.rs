//! OTP service module for phone verification
//!
//! This module provides the complete one-time-password workflow:
//! - Cryptographically secure code generation
//! - A dual-path store with a volatile cache in front of a durable repository
//! - Issuance with resend cooldown and SMS delivery
//! - Verification with bounded attempts and single-use consumption
//! - Periodic purging of expired records

mod cleanup;
mod generator;
mod manager;
pub mod mock;
mod store;
mod traits;
mod types;

#[cfg(test)]
mod tests;

pub use cleanup::{CleanupResult, OtpCleanupConfig, OtpCleanupService};
pub use generator::generate;
pub use manager::OtpManager;
pub use store::DualPathStore;
pub use traits::{DisabledCache, OtpCache, SmsGateway};
pub use types::{DeliveryReport, IssuedCode, Lookup, RecordSource, VerifyOutcome};
