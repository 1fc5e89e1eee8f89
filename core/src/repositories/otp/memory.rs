//! In-memory implementation of OtpRepository
//!
//! Used by tests and local development. A single lock guards the whole map,
//! so every trait method is atomic with respect to every other.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::entities::OtpRecord;
use crate::domain::value_objects::CanonicalPhone;
use crate::errors::StoreError;

use super::r#trait::{AttemptUpdate, OtpRepository, UpsertOutcome};

/// In-memory OTP repository
pub struct InMemoryOtpRepository {
    records: Arc<RwLock<HashMap<String, OtpRecord>>>,
    unavailable: AtomicBool,
    latency_ms: AtomicU64,
}

impl InMemoryOtpRepository {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
            unavailable: AtomicBool::new(false),
            latency_ms: AtomicU64::new(0),
        }
    }

    /// Make every call fail with `StoreError::Unavailable`
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Delay every call by `latency`
    pub fn set_latency(&self, latency: std::time::Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    /// Overwrite a record unconditionally
    pub async fn insert_raw(&self, record: OtpRecord) {
        let mut records = self.records.write().await;
        records.insert(record.phone.as_str().to_string(), record);
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    async fn check_available(&self) -> Result<(), StoreError> {
        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(latency)).await;
        }
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "in-memory store marked unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for InMemoryOtpRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OtpRepository for InMemoryOtpRepository {
    async fn upsert(
        &self,
        record: &OtpRecord,
        cooldown: Duration,
    ) -> Result<UpsertOutcome, StoreError> {
        self.check_available().await?;
        let mut records = self.records.write().await;

        let existing = records.get(record.phone.as_str());
        if let Some(retry_after) =
            existing.and_then(|e| e.cooldown_remaining(record.last_sent_at, cooldown))
        {
            return Ok(UpsertOutcome::CooldownActive { retry_after });
        }

        let stored = record.superseding(existing);
        records.insert(stored.phone.as_str().to_string(), stored.clone());
        Ok(UpsertOutcome::Stored(stored))
    }

    async fn find(&self, phone: &CanonicalPhone) -> Result<Option<OtpRecord>, StoreError> {
        self.check_available().await?;
        let records = self.records.read().await;
        Ok(records.get(phone.as_str()).cloned())
    }

    async fn consume(
        &self,
        phone: &CanonicalPhone,
        id: Uuid,
        max_attempts: u32,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        self.check_available().await?;
        let mut records = self.records.write().await;

        match records.get_mut(phone.as_str()) {
            Some(record)
                if record.id == id
                    && record.is_active_at(now)
                    && !record.attempts_exhausted(max_attempts) =>
            {
                record.consumed = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn increment_attempts(
        &self,
        phone: &CanonicalPhone,
        id: Uuid,
        max_attempts: u32,
        now: DateTime<Utc>,
    ) -> Result<AttemptUpdate, StoreError> {
        self.check_available().await?;
        let mut records = self.records.write().await;

        let record = match records.get_mut(phone.as_str()) {
            Some(record) if record.id == id && record.is_active_at(now) => record,
            _ => return Ok(AttemptUpdate::Gone),
        };

        if record.attempts_exhausted(max_attempts) {
            return Ok(AttemptUpdate::Exhausted);
        }

        record.attempts += 1;
        Ok(AttemptUpdate::Incremented(record.attempts))
    }

    async fn invalidate(&self, phone: &CanonicalPhone, id: Uuid) -> Result<bool, StoreError> {
        self.check_available().await?;
        let mut records = self.records.write().await;

        match records.get_mut(phone.as_str()) {
            Some(record) if record.id == id => {
                record.consumed = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_expired(
        &self,
        phone: &CanonicalPhone,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        self.check_available().await?;
        let mut records = self.records.write().await;

        let expired = records
            .get(phone.as_str())
            .map(|record| record.is_expired_at(now))
            .unwrap_or(false);
        if expired {
            records.remove(phone.as_str());
        }
        Ok(expired)
    }

    async fn purge_expired(&self, before: DateTime<Utc>) -> Result<u64, StoreError> {
        self.check_available().await?;
        let mut records = self.records.write().await;

        let initial = records.len();
        records.retain(|_, record| record.expires_at >= before);
        Ok((initial - records.len()) as u64)
    }
}
