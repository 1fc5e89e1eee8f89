//! Mock SMS gateway tests

use otp_core::{normalize, DeliveryReport, SmsGateway};

use crate::config::{SmsConfig, SmsProvider};
use crate::sms::{create_sms_gateway, MockSmsGateway};

#[tokio::test]
async fn test_mock_send_success() {
    let gateway = MockSmsGateway::new();
    let phone = normalize("+998901234567").unwrap();

    let report = gateway.send(&phone, "Your verification code is 123456").await;

    match report {
        DeliveryReport::Delivered { message_id } => assert!(message_id.starts_with("mock_")),
        other => panic!("unexpected report: {:?}", other),
    }
    assert_eq!(gateway.get_message_count(), 1);
}

#[tokio::test]
async fn test_mock_simulated_failure() {
    let gateway = MockSmsGateway::new();
    gateway.set_simulate_failure(true);
    let phone = normalize("+998901234567").unwrap();

    let report = gateway.send(&phone, "code").await;

    assert!(!report.is_delivered());
    assert_eq!(gateway.get_message_count(), 0);
}

#[tokio::test]
async fn test_mock_counter_reset() {
    let gateway = MockSmsGateway::new();
    let phone = normalize("+14155550123").unwrap();

    gateway.send(&phone, "one").await;
    gateway.send(&phone, "two").await;
    assert_eq!(gateway.get_message_count(), 2);

    gateway.reset_counter();
    assert_eq!(gateway.get_message_count(), 0);
}

#[test]
fn test_factory_selects_mock() {
    let gateway = create_sms_gateway(&SmsConfig::default());
    assert_eq!(gateway.provider_name(), "mock");
}

#[test]
fn test_factory_falls_back_without_credentials() {
    let config = SmsConfig {
        provider: SmsProvider::Eskiz,
        ..SmsConfig::default()
    };
    let gateway = create_sms_gateway(&config);
    assert_eq!(gateway.provider_name(), "mock");
}

#[test]
fn test_factory_selects_eskiz() {
    let config = SmsConfig {
        provider: SmsProvider::Eskiz,
        api_key: "ops@example.com".to_string(),
        api_secret: "secret".to_string(),
        ..SmsConfig::default()
    };
    let gateway = create_sms_gateway(&config);
    assert_eq!(gateway.provider_name(), "eskiz");
}
