//! OTP record entity for phone verification.

use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::CanonicalPhone;

/// One issued code for one phone
///
/// `expires_at` is absolute and stored explicitly; cache TTLs are derived
/// from it and never consulted for validity.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpRecord {
    /// Identifies this issuance; compare-and-set operations target it
    pub id: Uuid,

    /// Canonical phone number the code was sent to
    pub phone: CanonicalPhone,

    /// The numeric code
    pub code: String,

    /// Failed verification attempts since issuance
    pub attempts: u32,

    /// Timestamp when the code was created
    pub created_at: DateTime<Utc>,

    /// Timestamp after which the code no longer verifies
    pub expires_at: DateTime<Utc>,

    /// Timestamp of the last issuance for this phone, used for the resend cooldown
    pub last_sent_at: DateTime<Utc>,

    /// Set once the code verified successfully or was invalidated
    pub consumed: bool,

    /// Code of the unexpired issuance this one replaced, so that a late
    /// submission of it answers `NotFound` rather than `Mismatch`
    #[serde(default)]
    pub superseded_code: Option<String>,
}

impl OtpRecord {
    /// Create a fresh record for `phone` issued at `now`
    ///
    /// Timestamps are truncated to microseconds, the precision MySQL keeps,
    /// so the cached and durable copies compare equal.
    pub fn issue(phone: CanonicalPhone, code: String, now: DateTime<Utc>, ttl: Duration) -> Self {
        let now = now.trunc_subsecs(6);
        Self {
            id: Uuid::new_v4(),
            phone,
            code,
            attempts: 0,
            created_at: now,
            expires_at: now + ttl,
            last_sent_at: now,
            consumed: false,
            superseded_code: None,
        }
    }

    /// Checks if the code has expired at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Not consumed and not expired
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        !self.consumed && !self.is_expired_at(now)
    }

    /// Whether the attempt budget is spent
    pub fn attempts_exhausted(&self, max_attempts: u32) -> bool {
        self.attempts >= max_attempts
    }

    /// Build the record that replaces `previous` when this one is stored
    pub fn superseding(&self, previous: Option<&OtpRecord>) -> OtpRecord {
        let mut stored = self.clone();
        stored.superseded_code = previous
            .filter(|p| !p.is_expired_at(self.created_at))
            .map(|p| p.code.clone());
        stored
    }

    /// Time left until expiry, or zero if already expired
    pub fn time_until_expiration(&self, now: DateTime<Utc>) -> Duration {
        if self.expires_at > now {
            self.expires_at - now
        } else {
            Duration::zero()
        }
    }

    /// Time left before another code may be issued for this phone
    ///
    /// `None` when the cooldown has elapsed.
    pub fn cooldown_remaining(&self, now: DateTime<Utc>, cooldown: Duration) -> Option<Duration> {
        let resend_at = self.last_sent_at + cooldown;
        if resend_at > now {
            Some(resend_at - now)
        } else {
            None
        }
    }
}

impl std::fmt::Debug for OtpRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OtpRecord")
            .field("id", &self.id)
            .field("phone", &self.phone.masked())
            .field("code", &"<redacted>")
            .field("attempts", &self.attempts)
            .field("created_at", &self.created_at)
            .field("expires_at", &self.expires_at)
            .field("last_sent_at", &self.last_sent_at)
            .field("consumed", &self.consumed)
            .field(
                "superseded_code",
                &self.superseded_code.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

/// Round a duration up to whole seconds, never below one second
pub fn ceil_seconds(duration: Duration) -> u64 {
    let millis = duration.num_milliseconds().max(0) as u64;
    ((millis + 999) / 1000).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::normalize;
    use chrono::{TimeZone, Timelike};

    fn micros_now() -> DateTime<Utc> {
        Utc::now().trunc_subsecs(6)
    }

    fn record_at(now: DateTime<Utc>) -> OtpRecord {
        OtpRecord::issue(
            normalize("+998901234567").unwrap(),
            "012345".to_string(),
            now,
            Duration::seconds(300),
        )
    }

    #[test]
    fn test_issue_sets_lifecycle_fields() {
        let now = micros_now();
        let record = record_at(now);

        assert_eq!(record.attempts, 0);
        assert!(!record.consumed);
        assert_eq!(record.created_at, now);
        assert_eq!(record.last_sent_at, now);
        assert_eq!(record.expires_at, now + Duration::seconds(300));
        assert!(record.is_active_at(now));
    }

    #[test]
    fn test_issue_truncates_to_microseconds() {
        let issued_at = Utc
            .with_ymd_and_hms(2026, 3, 1, 12, 0, 0)
            .unwrap()
            .with_nanosecond(123_456_789)
            .unwrap();
        let record = record_at(issued_at);

        assert_eq!(record.created_at.nanosecond(), 123_456_000);
        assert_eq!(record.last_sent_at, record.created_at);
        assert_eq!(record.expires_at.nanosecond(), 123_456_000);
        assert_eq!(record.expires_at, record.created_at + Duration::seconds(300));
    }

    #[test]
    fn test_expiry_is_strictly_after_expires_at() {
        let now = micros_now();
        let record = record_at(now);

        assert!(!record.is_expired_at(record.expires_at));
        assert!(record.is_expired_at(record.expires_at + Duration::milliseconds(1)));
        assert!(!record.is_active_at(now + Duration::seconds(301)));
        assert_eq!(
            record.time_until_expiration(now + Duration::seconds(400)),
            Duration::zero()
        );
    }

    #[test]
    fn test_consumed_record_is_inactive() {
        let now = micros_now();
        let mut record = record_at(now);
        record.consumed = true;
        assert!(!record.is_active_at(now));
    }

    #[test]
    fn test_attempt_budget() {
        let mut record = record_at(micros_now());
        assert!(!record.attempts_exhausted(3));

        record.attempts = 2;
        assert!(!record.attempts_exhausted(3));

        record.attempts = 3;
        assert!(record.attempts_exhausted(3));

        record.attempts = 5;
        assert!(record.attempts_exhausted(3));
    }

    #[test]
    fn test_cooldown_remaining() {
        let now = micros_now();
        let record = record_at(now);
        let cooldown = Duration::seconds(60);

        assert_eq!(
            record.cooldown_remaining(now + Duration::seconds(20), cooldown),
            Some(Duration::seconds(40))
        );
        assert_eq!(record.cooldown_remaining(now + Duration::seconds(60), cooldown), None);
        assert_eq!(record.cooldown_remaining(now, Duration::zero()), None);
    }

    #[test]
    fn test_debug_redacts_code() {
        let record = record_at(micros_now());
        let rendered = format!("{:?}", record);
        assert!(!rendered.contains("012345"));
        assert!(!rendered.contains("+998901234567"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_superseding_carries_unexpired_code_only() {
        let now = micros_now();
        let previous = record_at(now - Duration::seconds(100));
        let mut next = record_at(now);
        next.code = "654321".to_string();

        let stored = next.superseding(Some(&previous));
        assert_eq!(stored.superseded_code.as_deref(), Some("012345"));
        assert_eq!(stored.id, next.id);

        let expired = record_at(now - Duration::seconds(400));
        assert_eq!(next.superseding(Some(&expired)).superseded_code, None);
        assert_eq!(next.superseding(None).superseded_code, None);
    }

    #[test]
    fn test_ceil_seconds() {
        assert_eq!(ceil_seconds(Duration::milliseconds(1)), 1);
        assert_eq!(ceil_seconds(Duration::milliseconds(1500)), 2);
        assert_eq!(ceil_seconds(Duration::seconds(40)), 40);
        assert_eq!(ceil_seconds(Duration::zero()), 1);
    }

    #[test]
    fn test_serialization() {
        let record = record_at(micros_now());
        let json = serde_json::to_string(&record).unwrap();
        let deserialized: OtpRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(record, deserialized);
    }
}
