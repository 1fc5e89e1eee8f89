//! Traits for the cache tier and the SMS gateway

use async_trait::async_trait;

use crate::domain::entities::OtpRecord;
use crate::domain::value_objects::CanonicalPhone;
use crate::errors::CacheError;

use super::types::DeliveryReport;

/// Volatile key-value tier in front of the durable repository
///
/// Entries are keyed by canonical phone and hold a full copy of the record.
/// The cache is never authoritative: every failure is absorbed by the store.
#[async_trait]
pub trait OtpCache: Send + Sync {
    /// Load the cached copy of the phone's record
    async fn get(&self, phone: &CanonicalPhone) -> Result<Option<OtpRecord>, CacheError>;
    /// Store a copy of `record` that the backend drops after `ttl`
    async fn set(&self, record: &OtpRecord, ttl: std::time::Duration) -> Result<(), CacheError>;
    /// Remove the phone's entry
    async fn delete(&self, phone: &CanonicalPhone) -> Result<(), CacheError>;
}

/// Outbound SMS delivery
#[async_trait]
pub trait SmsGateway: Send + Sync {
    /// Send `message` to `phone`
    ///
    /// Failures are reported in the returned [`DeliveryReport`], never by panicking.
    async fn send(&self, phone: &CanonicalPhone, message: &str) -> DeliveryReport;
    /// Provider name for logs
    fn provider_name(&self) -> &str;
}

/// Cache used when the volatile tier is switched off; every read misses
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledCache;

#[async_trait]
impl OtpCache for DisabledCache {
    async fn get(&self, _phone: &CanonicalPhone) -> Result<Option<OtpRecord>, CacheError> {
        Ok(None)
    }

    async fn set(&self, _record: &OtpRecord, _ttl: std::time::Duration) -> Result<(), CacheError> {
        Ok(())
    }

    async fn delete(&self, _phone: &CanonicalPhone) -> Result<(), CacheError> {
        Ok(())
    }
}
