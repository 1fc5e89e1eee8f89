//! OTP repository trait defining the durable, authoritative tier of the OTP store.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::domain::entities::OtpRecord;
use crate::domain::value_objects::CanonicalPhone;
use crate::errors::StoreError;

/// Result of a guarded upsert
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// The record replaced whatever the phone had before; carries the row as
    /// persisted, see [`OtpRecord::superseding`]
    Stored(OtpRecord),
    /// The previous issuance is still inside the resend cooldown; nothing was written
    CooldownActive { retry_after: Duration },
}

/// Result of an attempt-counter increment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptUpdate {
    /// Counter incremented to the contained value
    Incremented(u32),
    /// Counter was already at the maximum; nothing was written
    Exhausted,
    /// The issuance no longer exists, was consumed, superseded or expired
    Gone,
}

/// Repository trait for durable OTP record persistence
///
/// One row per canonical phone. Every method is a single atomic operation
/// against the backing store; implementations must not split a
/// read-check-write sequence across separate statements without a lock or
/// transaction.
///
/// # Security Considerations
/// - Implementations must never log the `code` column
/// - Consumed rows are kept until expiry so the resend cooldown survives
#[async_trait]
pub trait OtpRepository: Send + Sync {
    /// Insert or replace the phone's record inside one transaction
    ///
    /// The existing row, if any, is locked first. When its `last_sent_at`
    /// plus `cooldown` is later than `record.last_sent_at`, nothing is
    /// written and `CooldownActive` reports the remaining wait. Otherwise the
    /// row is replaced by `record.superseding(existing)`.
    async fn upsert(
        &self,
        record: &OtpRecord,
        cooldown: Duration,
    ) -> Result<UpsertOutcome, StoreError>;

    /// Load the phone's record in whatever state it is in
    async fn find(&self, phone: &CanonicalPhone) -> Result<Option<OtpRecord>, StoreError>;

    /// Compare-and-set the issuance `id` from unconsumed to consumed
    ///
    /// Succeeds only if the row still carries `id`, is not consumed, has not
    /// expired at `now`, and has fewer than `max_attempts` failed attempts.
    /// Returns `true` for exactly one caller.
    async fn consume(
        &self,
        phone: &CanonicalPhone,
        id: Uuid,
        max_attempts: u32,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Atomically increment the failed-attempt counter of issuance `id`,
    /// never past `max_attempts`
    async fn increment_attempts(
        &self,
        phone: &CanonicalPhone,
        id: Uuid,
        max_attempts: u32,
        now: DateTime<Utc>,
    ) -> Result<AttemptUpdate, StoreError>;

    /// Mark issuance `id` consumed regardless of its state
    ///
    /// Returns whether a matching row existed.
    async fn invalidate(&self, phone: &CanonicalPhone, id: Uuid) -> Result<bool, StoreError>;

    /// Delete the phone's record if it expired before `now`
    async fn delete_expired(
        &self,
        phone: &CanonicalPhone,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Delete every record that expired before `before` (maintenance)
    async fn purge_expired(&self, before: DateTime<Utc>) -> Result<u64, StoreError>;
}
