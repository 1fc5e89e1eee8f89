//! Mock SMS Gateway Implementation
//!
//! Logs outgoing messages instead of sending them. Message bodies carry the
//! code, so only their length is logged.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use otp_core::{CanonicalPhone, DeliveryReport, SmsGateway};

/// Mock SMS gateway for development and testing
#[derive(Clone)]
pub struct MockSmsGateway {
    /// Counter for tracking number of messages sent
    message_count: Arc<AtomicU64>,
    /// Whether to simulate failures
    simulate_failure: Arc<AtomicBool>,
}

impl MockSmsGateway {
    pub fn new() -> Self {
        Self {
            message_count: Arc::new(AtomicU64::new(0)),
            simulate_failure: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Get the total number of messages sent
    pub fn get_message_count(&self) -> u64 {
        self.message_count.load(Ordering::SeqCst)
    }

    /// Reset the message counter
    pub fn reset_counter(&self) {
        self.message_count.store(0, Ordering::SeqCst);
    }

    /// Enable or disable failure simulation
    pub fn set_simulate_failure(&self, simulate: bool) {
        self.simulate_failure.store(simulate, Ordering::SeqCst);
    }
}

impl Default for MockSmsGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SmsGateway for MockSmsGateway {
    async fn send(&self, phone: &CanonicalPhone, message: &str) -> DeliveryReport {
        if self.simulate_failure.load(Ordering::SeqCst) {
            warn!(
                target: "sms_gateway",
                provider = "mock",
                phone = %phone.masked(),
                "Mock SMS gateway simulating failure"
            );
            return DeliveryReport::Failed {
                reason: "Simulated SMS sending failure".to_string(),
            };
        }

        let message_id = format!("mock_{}", Uuid::new_v4());
        let count = self.message_count.fetch_add(1, Ordering::SeqCst) + 1;

        info!(
            target: "sms_gateway",
            provider = "mock",
            phone = %phone.masked(),
            message_id = %message_id,
            message_length = message.len(),
            count,
            "SMS sent successfully (mock)"
        );

        DeliveryReport::Delivered { message_id }
    }

    fn provider_name(&self) -> &str {
        "mock"
    }
}
