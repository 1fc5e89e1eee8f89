//! OTP manager: issuance with resend cooldown and verification with bounded attempts

use chrono::{Duration, Utc};
use constant_time_eq::constant_time_eq;
use std::sync::Arc;

use otp_shared::{ConfigError, OtpConfig};

use crate::domain::entities::otp_record::{ceil_seconds, OtpRecord};
use crate::domain::value_objects::{normalize, CanonicalPhone};
use crate::errors::{OtpError, OtpResult};
use crate::repositories::otp::{AttemptUpdate, OtpRepository, UpsertOutcome};

use super::generator::generate;
use super::store::DualPathStore;
use super::traits::{OtpCache, SmsGateway};
use super::types::{DeliveryReport, IssuedCode, RecordSource, VerifyOutcome};

/// What one verification pass against a record concluded
enum Decision {
    Final(VerifyOutcome),
    /// The record no longer matches the authoritative issuance
    Stale,
}

/// Issues and verifies one-time codes for phone numbers
///
/// Any of the three collaborators may be a trait object, e.g.
/// `OtpManager<MySqlOtpRepository, dyn OtpCache, dyn SmsGateway>`.
pub struct OtpManager<R, C, S>
where
    R: OtpRepository + ?Sized,
    C: OtpCache + ?Sized,
    S: SmsGateway + ?Sized,
{
    /// Dual-path record store
    store: DualPathStore<R, C>,
    /// SMS gateway for sending codes
    sms_gateway: Arc<S>,
    /// Validated configuration
    config: OtpConfig,
}

impl<R, C, S> OtpManager<R, C, S>
where
    R: OtpRepository + ?Sized,
    C: OtpCache + ?Sized,
    S: SmsGateway + ?Sized,
{
    /// Create a new OTP manager
    ///
    /// # Arguments
    ///
    /// * `repository` - Durable, authoritative record store
    /// * `cache` - Volatile cache in front of the repository
    /// * `sms_gateway` - SMS delivery
    /// * `config` - OTP settings; rejected if invalid
    pub fn new(
        repository: Arc<R>,
        cache: Arc<C>,
        sms_gateway: Arc<S>,
        config: OtpConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        Ok(Self {
            store: DualPathStore::new(repository, cache, &config),
            sms_gateway,
            config,
        })
    }

    pub fn config(&self) -> &OtpConfig {
        &self.config
    }

    /// Issue a new code for a phone number and send it by SMS
    ///
    /// This method:
    /// 1. Normalizes the phone number
    /// 2. Generates a fresh code
    /// 3. Stores it, refusing while the previous issuance is inside the cooldown
    /// 4. Sends it via the SMS gateway
    /// 5. Invalidates it again if delivery fails
    ///
    /// # Returns
    ///
    /// * `Ok(IssuedCode)` - Receipt without the code value
    /// * `Err(OtpError)` - `InvalidPhone`, `CooldownActive`, `DeliveryFailed`
    ///   or `StorageUnavailable`
    pub async fn request_code(&self, raw_phone: &str) -> OtpResult<IssuedCode> {
        let phone = normalize(raw_phone).map_err(|e| {
            tracing::warn!(event = "invalid_phone", "Rejected OTP request for invalid phone");
            e
        })?;

        let now = Utc::now();
        let record = OtpRecord::issue(
            phone.clone(),
            generate(self.config.code_length),
            now,
            Duration::seconds(self.config.code_ttl_seconds),
        );
        let cooldown = Duration::seconds(self.config.resend_cooldown_seconds);

        let record = match self.store.put(&record, cooldown).await? {
            UpsertOutcome::Stored(stored) => stored,
            UpsertOutcome::CooldownActive { retry_after } => {
                let retry_after_seconds = ceil_seconds(retry_after);
                tracing::warn!(
                    phone = %phone.masked(),
                    retry_after_seconds = retry_after_seconds,
                    event = "otp_cooldown_active",
                    "OTP request refused during resend cooldown"
                );
                return Err(OtpError::CooldownActive { retry_after_seconds });
            }
        };

        tracing::info!(
            phone = %phone.masked(),
            event = "otp_generated",
            session_id = %record.id,
            "Generated new OTP for phone number"
        );

        match self.deliver(&phone, &record).await {
            DeliveryReport::Delivered { message_id } => {
                tracing::info!(
                    phone = %phone.masked(),
                    provider = self.sms_gateway.provider_name(),
                    message_id = %message_id,
                    event = "otp_sent",
                    "OTP delivered to SMS gateway"
                );
                Ok(IssuedCode {
                    masked_phone: phone.masked(),
                    expires_at: record.expires_at,
                    next_resend_at: record.last_sent_at + cooldown,
                    message_id,
                })
            }
            DeliveryReport::Failed { reason } => {
                tracing::error!(
                    phone = %phone.masked(),
                    provider = self.sms_gateway.provider_name(),
                    reason = %reason,
                    event = "otp_delivery_failed",
                    "OTP delivery failed; invalidating code"
                );
                self.store.invalidate(&record).await?;
                Err(OtpError::DeliveryFailed { reason })
            }
        }
    }

    /// Verify a submitted code for a phone number
    ///
    /// A successful match consumes the code, so exactly one caller ever sees
    /// `Verified` for a given issuance.
    pub async fn verify_code(&self, raw_phone: &str, submitted: &str) -> OtpResult<VerifyOutcome> {
        let phone = normalize(raw_phone)?;
        let submitted = submitted.trim();

        let lookup = match self.store.get(&phone).await? {
            Some(lookup) => lookup,
            None => return Ok(self.not_found(&phone)),
        };

        match self.decide(&lookup.record, lookup.source, submitted).await? {
            Decision::Final(outcome) => Ok(outcome),
            Decision::Stale if lookup.source == RecordSource::Cache => {
                tracing::debug!(
                    phone = %phone.masked(),
                    "Cached OTP record was stale; re-checking durable store"
                );
                self.store.evict(&phone).await;

                match self.store.get_authoritative(&phone).await? {
                    Some(fresh) => match self.decide(&fresh.record, fresh.source, submitted).await? {
                        Decision::Final(outcome) => Ok(outcome),
                        Decision::Stale => Ok(self.not_found(&phone)),
                    },
                    None => Ok(self.not_found(&phone)),
                }
            }
            Decision::Stale => Ok(self.not_found(&phone)),
        }
    }

    async fn deliver(&self, phone: &CanonicalPhone, record: &OtpRecord) -> DeliveryReport {
        let message = self.config.render_message(&record.code);
        let timeout = self.config.sms_timeout();

        match tokio::time::timeout(timeout, self.sms_gateway.send(phone, &message)).await {
            Ok(report) => report,
            Err(_) => DeliveryReport::Failed {
                reason: format!("SMS gateway timed out after {} ms", timeout.as_millis()),
            },
        }
    }

    async fn decide(
        &self,
        record: &OtpRecord,
        source: RecordSource,
        submitted: &str,
    ) -> OtpResult<Decision> {
        let max_attempts = self.config.max_attempts;

        if record.attempts_exhausted(max_attempts) {
            // Only the durable row may lock a phone out
            if source == RecordSource::Cache {
                return Ok(Decision::Stale);
            }
            return Ok(Decision::Final(self.attempts_exceeded(record)));
        }

        if codes_match(&record.code, submitted) {
            if self.store.consume(record, max_attempts).await? {
                tracing::info!(
                    phone = %record.phone.masked(),
                    session_id = %record.id,
                    event = "otp_verified",
                    "OTP verified successfully"
                );
                return Ok(Decision::Final(VerifyOutcome::Verified));
            }
            return Ok(Decision::Stale);
        }

        let superseded = record
            .superseded_code
            .as_deref()
            .map_or(false, |previous| codes_match(previous, submitted));

        match self.store.increment_attempts(record, max_attempts).await? {
            AttemptUpdate::Incremented(attempts) if superseded => {
                tracing::info!(
                    phone = %record.phone.masked(),
                    session_id = %record.id,
                    attempts = attempts,
                    event = "otp_superseded_code",
                    "Submitted code belongs to a replaced issuance"
                );
                Ok(Decision::Final(VerifyOutcome::NotFound))
            }
            AttemptUpdate::Incremented(attempts) => {
                let attempts_remaining = max_attempts.saturating_sub(attempts);
                tracing::warn!(
                    phone = %record.phone.masked(),
                    session_id = %record.id,
                    attempts = attempts,
                    attempts_remaining = attempts_remaining,
                    event = "otp_mismatch",
                    "OTP verification failed"
                );
                Ok(Decision::Final(VerifyOutcome::Mismatch { attempts_remaining }))
            }
            AttemptUpdate::Exhausted => Ok(Decision::Final(self.attempts_exceeded(record))),
            AttemptUpdate::Gone => Ok(Decision::Stale),
        }
    }

    fn attempts_exceeded(&self, record: &OtpRecord) -> VerifyOutcome {
        tracing::warn!(
            phone = %record.phone.masked(),
            session_id = %record.id,
            event = "otp_attempts_exceeded",
            "OTP attempt budget exhausted"
        );
        VerifyOutcome::AttemptsExceeded
    }

    fn not_found(&self, phone: &CanonicalPhone) -> VerifyOutcome {
        tracing::info!(
            phone = %phone.masked(),
            event = "otp_not_found",
            "No active OTP for phone number"
        );
        VerifyOutcome::NotFound
    }
}

/// Constant-time comparison; a length mismatch is rejected up front
fn codes_match(expected: &str, submitted: &str) -> bool {
    expected.len() == submitted.len() && constant_time_eq(expected.as_bytes(), submitted.as_bytes())
}
