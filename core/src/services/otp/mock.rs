//! In-process cache and SMS gateway doubles
//!
//! Used by unit tests, the integration tests and local wiring without Redis.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::domain::entities::OtpRecord;
use crate::domain::value_objects::CanonicalPhone;
use crate::errors::CacheError;

use super::traits::{OtpCache, SmsGateway};
use super::types::DeliveryReport;

/// In-memory OTP cache honoring per-entry TTLs
pub struct MockOtpCache {
    entries: Arc<Mutex<HashMap<String, (OtpRecord, Instant)>>>,
    unavailable: AtomicBool,
    latency_ms: AtomicU64,
}

impl MockOtpCache {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            unavailable: AtomicBool::new(false),
            latency_ms: AtomicU64::new(0),
        }
    }

    /// Make every call fail with `CacheError::Unavailable`
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Delay every call by `latency`
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    /// Overwrite an entry directly, bypassing failure injection
    pub fn insert_raw(&self, record: OtpRecord, ttl: Duration) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(record.phone.as_str().to_string(), (record, Instant::now() + ttl));
    }

    /// Read an entry directly, bypassing failure injection
    pub fn peek(&self, phone: &CanonicalPhone) -> Option<OtpRecord> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(phone.as_str())
            .filter(|(_, deadline)| *deadline > Instant::now())
            .map(|(record, _)| record.clone())
    }

    async fn check_available(&self) -> Result<(), CacheError> {
        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CacheError::Unavailable("mock cache marked unavailable".to_string()));
        }
        Ok(())
    }
}

impl Default for MockOtpCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OtpCache for MockOtpCache {
    async fn get(&self, phone: &CanonicalPhone) -> Result<Option<OtpRecord>, CacheError> {
        self.check_available().await?;
        Ok(self.peek(phone))
    }

    async fn set(&self, record: &OtpRecord, ttl: Duration) -> Result<(), CacheError> {
        self.check_available().await?;
        self.insert_raw(record.clone(), ttl);
        Ok(())
    }

    async fn delete(&self, phone: &CanonicalPhone) -> Result<(), CacheError> {
        self.check_available().await?;
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).remove(phone.as_str());
        Ok(())
    }
}

/// SMS gateway that records every message instead of sending it
pub struct RecordingSmsGateway {
    sent: Arc<Mutex<Vec<(String, String)>>>,
    counter: AtomicU64,
    should_fail: AtomicBool,
    latency_ms: AtomicU64,
}

impl RecordingSmsGateway {
    pub fn new() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            counter: AtomicU64::new(0),
            should_fail: AtomicBool::new(false),
            latency_ms: AtomicU64::new(0),
        }
    }

    /// Report every send as failed
    pub fn set_should_fail(&self, should_fail: bool) {
        self.should_fail.store(should_fail, Ordering::SeqCst);
    }

    /// Delay every send by `latency`
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    /// Number of messages accepted
    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Last message accepted for `phone`
    pub fn last_message_to(&self, phone: &str) -> Option<String> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .rev()
            .find(|(to, _)| to == phone)
            .map(|(_, message)| message.clone())
    }
}

impl Default for RecordingSmsGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SmsGateway for RecordingSmsGateway {
    async fn send(&self, phone: &CanonicalPhone, message: &str) -> DeliveryReport {
        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }

        if self.should_fail.load(Ordering::SeqCst) {
            return DeliveryReport::Failed {
                reason: "recording gateway set to fail".to_string(),
            };
        }

        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((phone.as_str().to_string(), message.to_string()));
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        DeliveryReport::Delivered {
            message_id: format!("recorded-{:06}", n),
        }
    }

    fn provider_name(&self) -> &str {
        "recording"
    }
}
