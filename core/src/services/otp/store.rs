//! Dual-path OTP store: a volatile cache in front of the durable repository
//!
//! The durable repository is authoritative. Every durable call is bounded by
//! `store_timeout` and its failure aborts the operation. Every cache call is
//! bounded by `cache_timeout` and its failure is logged and absorbed.

use chrono::{Duration, Utc};
use std::future::Future;
use std::sync::Arc;

use otp_shared::OtpConfig;

use crate::domain::entities::OtpRecord;
use crate::domain::value_objects::CanonicalPhone;
use crate::errors::{CacheError, StoreError};
use crate::repositories::otp::{AttemptUpdate, OtpRepository, UpsertOutcome};

use super::traits::OtpCache;
use super::types::{Lookup, RecordSource};

/// Store that keeps the cache and the durable repository in agreement
pub struct DualPathStore<R: OtpRepository + ?Sized, C: OtpCache + ?Sized> {
    repository: Arc<R>,
    cache: Arc<C>,
    cache_timeout: std::time::Duration,
    store_timeout: std::time::Duration,
}

impl<R: OtpRepository + ?Sized, C: OtpCache + ?Sized> DualPathStore<R, C> {
    pub fn new(repository: Arc<R>, cache: Arc<C>, config: &OtpConfig) -> Self {
        Self {
            repository,
            cache,
            cache_timeout: config.cache_timeout(),
            store_timeout: config.store_timeout(),
        }
    }

    /// Durable upsert under the resend cooldown, then a best-effort cache write
    pub async fn put(
        &self,
        record: &OtpRecord,
        cooldown: Duration,
    ) -> Result<UpsertOutcome, StoreError> {
        let outcome = self
            .durable("upsert", self.repository.upsert(record, cooldown))
            .await?;

        if let UpsertOutcome::Stored(stored) = &outcome {
            self.mirror(stored).await;
        }
        Ok(outcome)
    }

    /// Load the phone's active record, cache first
    ///
    /// Expired and consumed records are reported as absent.
    pub async fn get(&self, phone: &CanonicalPhone) -> Result<Option<Lookup>, StoreError> {
        match self.cached("get", self.cache.get(phone)).await {
            Ok(Some(record)) if record.is_active_at(Utc::now()) => {
                tracing::debug!(phone = %phone.masked(), "OTP record served from cache");
                return Ok(Some(Lookup {
                    record,
                    source: RecordSource::Cache,
                }));
            }
            Ok(Some(_)) => {
                // Inactive copy; the durable tier decides what happens to it
                self.evict(phone).await;
            }
            Ok(None) => {}
            Err(_) => {
                tracing::debug!(phone = %phone.masked(), "Falling back to durable store");
            }
        }

        self.get_authoritative(phone).await
    }

    /// Load the phone's active record from the durable store only, then
    /// repopulate the cache
    pub async fn get_authoritative(
        &self,
        phone: &CanonicalPhone,
    ) -> Result<Option<Lookup>, StoreError> {
        let now = Utc::now();
        let record = match self.durable("find", self.repository.find(phone)).await? {
            Some(record) => record,
            None => return Ok(None),
        };

        if record.is_expired_at(now) {
            // Expired records are removed from both tiers on read
            if let Err(e) = self
                .durable("delete_expired", self.repository.delete_expired(phone, now))
                .await
            {
                tracing::warn!(
                    phone = %phone.masked(),
                    error = %e,
                    "Failed to delete expired OTP record"
                );
            }
            self.evict(phone).await;
            return Ok(None);
        }

        if record.consumed {
            return Ok(None);
        }

        self.mirror(&record).await;
        Ok(Some(Lookup {
            record,
            source: RecordSource::Durable,
        }))
    }

    /// Mark the issuance consumed in the durable store, then drop the cache entry
    pub async fn invalidate(&self, record: &OtpRecord) -> Result<(), StoreError> {
        self.durable(
            "invalidate",
            self.repository.invalidate(&record.phone, record.id),
        )
        .await?;
        self.evict(&record.phone).await;
        Ok(())
    }

    /// Bounded atomic increment of the issuance's failed-attempt counter
    pub async fn increment_attempts(
        &self,
        record: &OtpRecord,
        max_attempts: u32,
    ) -> Result<AttemptUpdate, StoreError> {
        let update = self
            .durable(
                "increment_attempts",
                self.repository
                    .increment_attempts(&record.phone, record.id, max_attempts, Utc::now()),
            )
            .await?;

        match update {
            AttemptUpdate::Incremented(attempts) => {
                let mut updated = record.clone();
                updated.attempts = attempts;
                self.mirror(&updated).await;
            }
            AttemptUpdate::Exhausted | AttemptUpdate::Gone => self.evict(&record.phone).await,
        }
        Ok(update)
    }

    /// Compare-and-set the issuance to consumed; `true` for the winning caller
    pub async fn consume(&self, record: &OtpRecord, max_attempts: u32) -> Result<bool, StoreError> {
        let won = self
            .durable(
                "consume",
                self.repository
                    .consume(&record.phone, record.id, max_attempts, Utc::now()),
            )
            .await?;
        self.evict(&record.phone).await;
        Ok(won)
    }

    /// Best-effort removal of the phone's cache entry
    pub async fn evict(&self, phone: &CanonicalPhone) {
        let _ = self.cached("delete", self.cache.delete(phone)).await;
    }

    /// Write `record` to the cache with a TTL derived from `expires_at`;
    /// on failure try to evict whatever copy is there
    async fn mirror(&self, record: &OtpRecord) {
        let ttl = record
            .time_until_expiration(Utc::now())
            .to_std()
            .unwrap_or_default();
        if ttl.is_zero() {
            self.evict(&record.phone).await;
            return;
        }

        if self.cached("set", self.cache.set(record, ttl)).await.is_err() {
            self.evict(&record.phone).await;
        }
    }

    async fn durable<T, F>(&self, operation: &'static str, call: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        let result = match tokio::time::timeout(self.store_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout(self.store_timeout.as_millis() as u64)),
        };

        if let Err(e) = &result {
            tracing::error!(
                operation = operation,
                error = %e,
                event = "otp_store_failed",
                "Durable OTP store call failed"
            );
        }
        result
    }

    async fn cached<T, F>(&self, operation: &'static str, call: F) -> Result<T, CacheError>
    where
        F: Future<Output = Result<T, CacheError>>,
    {
        let result = match tokio::time::timeout(self.cache_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(CacheError::Timeout(self.cache_timeout.as_millis() as u64)),
        };

        if let Err(e) = &result {
            tracing::warn!(
                operation = operation,
                error = %e,
                event = "otp_cache_degraded",
                "OTP cache call failed"
            );
        }
        result
    }
}
