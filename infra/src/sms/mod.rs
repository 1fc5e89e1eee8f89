//! SMS Gateway Module
//!
//! Outbound SMS gateways implementing `otp_core::SmsGateway`.
//!
//! ## Features
//!
//! - **Mock Implementation**: logs instead of sending, for development
//! - **Eskiz Support**: production SMS via the Eskiz.uz HTTP API
//! - **Security**: phone numbers are masked and message bodies never logged

use std::sync::Arc;

use otp_core::SmsGateway;

use crate::config::{SmsConfig, SmsProvider};

pub mod eskiz;
pub mod mock_sms;

pub use eskiz::EskizSmsGateway;
pub use mock_sms::MockSmsGateway;

#[cfg(test)]
mod tests;

/// Create an SMS gateway based on configuration
///
/// Returns the gateway for the configured provider. A provider that cannot
/// be initialized falls back to the mock gateway with a warning.
///
/// # Arguments
///
/// * `config` - SMS configuration containing provider settings
///
/// # Returns
///
/// A shared SMS gateway implementation
pub fn create_sms_gateway(config: &SmsConfig) -> Arc<dyn SmsGateway> {
    match config.provider {
        SmsProvider::Mock => Arc::new(MockSmsGateway::new()),
        SmsProvider::Eskiz => match EskizSmsGateway::new(config) {
            Ok(gateway) => Arc::new(gateway),
            Err(e) => {
                tracing::error!("Failed to initialize Eskiz SMS gateway: {}", e);
                tracing::warn!("Falling back to mock SMS gateway");
                Arc::new(MockSmsGateway::new())
            }
        },
    }
}
