//! Tests for the SMS gateways

mod mock_sms_tests;
