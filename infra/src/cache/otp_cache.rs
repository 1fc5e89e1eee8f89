//! Redis-backed OTP cache tier
//!
//! Each phone maps to one key holding the JSON-serialized record. The key's
//! TTL is derived from `expires_at`; validity is always re-checked against
//! `expires_at` by the store, never against the key's TTL.

use async_trait::async_trait;
use std::time::Duration;

use otp_core::{CacheError, CanonicalPhone, OtpCache, OtpRecord};

use super::redis_client::RedisClient;
use crate::InfrastructureError;

/// Redis key prefix for OTP records
const OTP_KEY_PREFIX: &str = "otp:record";

/// OTP cache backed by Redis
#[derive(Clone)]
pub struct RedisOtpCache {
    client: RedisClient,
}

impl RedisOtpCache {
    pub fn new(client: RedisClient) -> Self {
        Self { client }
    }

    fn record_key(&self, phone: &CanonicalPhone) -> String {
        self.client.make_key(&record_key(phone))
    }
}

/// Unprefixed cache key for a phone's record
pub fn record_key(phone: &CanonicalPhone) -> String {
    format!("{}:{}", OTP_KEY_PREFIX, phone.as_str())
}

/// Redis expiry in whole seconds, rounded up and never zero
pub fn expiry_seconds(ttl: Duration) -> u64 {
    let secs = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
    secs.max(1)
}

fn cache_error(e: InfrastructureError) -> CacheError {
    CacheError::Unavailable(e.to_string())
}

#[async_trait]
impl OtpCache for RedisOtpCache {
    async fn get(&self, phone: &CanonicalPhone) -> Result<Option<OtpRecord>, CacheError> {
        let key = self.record_key(phone);
        let raw = match self.client.get(&key).await.map_err(cache_error)? {
            Some(raw) => raw,
            None => return Ok(None),
        };

        match serde_json::from_str::<OtpRecord>(&raw) {
            Ok(record) if record.phone == *phone => Ok(Some(record)),
            Ok(_) => Err(CacheError::Serialization(
                "cached record belongs to another phone".to_string(),
            )),
            Err(e) => {
                tracing::warn!(
                    phone = %phone.masked(),
                    error = %e,
                    "Dropping unreadable cached OTP record"
                );
                let _ = self.client.delete(&key).await;
                Err(CacheError::Serialization(e.to_string()))
            }
        }
    }

    async fn set(&self, record: &OtpRecord, ttl: Duration) -> Result<(), CacheError> {
        let payload =
            serde_json::to_string(record).map_err(|e| CacheError::Serialization(e.to_string()))?;

        self.client
            .set_with_expiry(&self.record_key(&record.phone), &payload, expiry_seconds(ttl))
            .await
            .map_err(cache_error)
    }

    async fn delete(&self, phone: &CanonicalPhone) -> Result<(), CacheError> {
        self.client
            .delete(&self.record_key(phone))
            .await
            .map(|_| ())
            .map_err(cache_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use otp_core::normalize;

    #[test]
    fn test_record_key() {
        let phone = normalize("+998 90 123 45 67").unwrap();
        assert_eq!(record_key(&phone), "otp:record:+998901234567");
    }

    #[test]
    fn test_expiry_seconds_rounds_up() {
        assert_eq!(expiry_seconds(Duration::from_secs(300)), 300);
        assert_eq!(expiry_seconds(Duration::from_millis(299_001)), 300);
        assert_eq!(expiry_seconds(Duration::from_millis(10)), 1);
        assert_eq!(expiry_seconds(Duration::ZERO), 1);
    }
}
