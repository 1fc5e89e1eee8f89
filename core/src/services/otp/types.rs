//! Types for OTP service results

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entities::OtpRecord;

/// Outcome of one SMS send attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryReport {
    /// The provider accepted the message
    Delivered { message_id: String },
    /// The provider rejected the message or could not be reached
    Failed { reason: String },
}

impl DeliveryReport {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryReport::Delivered { .. })
    }
}

/// Receipt for a successfully issued code
///
/// Deliberately carries no code value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedCode {
    /// Phone in masked form, safe to echo back or log
    pub masked_phone: String,
    /// When the code stops verifying
    pub expires_at: DateTime<Utc>,
    /// When the caller may request another code
    pub next_resend_at: DateTime<Utc>,
    /// The SMS message ID from the provider
    pub message_id: String,
}

/// Result of a verification attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum VerifyOutcome {
    /// Code matched; the record is now consumed
    Verified,
    /// Code did not match
    Mismatch { attempts_remaining: u32 },
    /// The attempt budget for this issuance is spent
    AttemptsExceeded,
    /// No active code for this phone
    NotFound,
}

/// Which tier answered a lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordSource {
    Cache,
    Durable,
}

/// An active record together with where it was read from
#[derive(Debug, Clone)]
pub struct Lookup {
    pub record: OtpRecord,
    pub source: RecordSource,
}
