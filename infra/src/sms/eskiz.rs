//! Eskiz.uz SMS Gateway Implementation
//!
//! Sends SMS through the Eskiz.uz HTTP API.
//!
//! ## Protocol
//!
//! - `POST /api/auth/login` (form: `email`, `password`) returns a bearer
//!   token under `data.token`, valid for roughly a day
//! - `POST /api/message/sms/send` (JSON: `mobile_phone`, `message`, `from`)
//!   with `Authorization: Bearer <token>`
//!
//! The token is cached for 23 hours. A 401 on send drops it, logs in again
//! and retries the send once.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use otp_core::{CanonicalPhone, DeliveryReport, SmsGateway};

use crate::config::SmsConfig;
use crate::InfrastructureError;

/// Production API endpoint
pub const DEFAULT_BASE_URL: &str = "https://notify.eskiz.uz";

const LOGIN_PATH: &str = "/api/auth/login";
const SEND_PATH: &str = "/api/message/sms/send";

/// How long a login token is reused
const TOKEN_LIFETIME: Duration = Duration::from_secs(23 * 60 * 60);

struct CachedToken {
    value: String,
    expires_at: Instant,
}

#[derive(Deserialize)]
struct LoginResponse {
    data: LoginData,
}

#[derive(Deserialize)]
struct LoginData {
    token: String,
}

#[derive(Serialize)]
struct SendRequest<'a> {
    mobile_phone: &'a str,
    message: &'a str,
    from: &'a str,
}

#[derive(Deserialize)]
struct SendResponse {
    #[serde(default)]
    id: Option<serde_json::Value>,
}

enum SendAttempt {
    Sent(String),
    Unauthorized,
}

/// Eskiz.uz SMS gateway
pub struct EskizSmsGateway {
    client: reqwest::Client,
    base_url: String,
    email: String,
    password: String,
    sender: String,
    token: RwLock<Option<CachedToken>>,
}

impl EskizSmsGateway {
    /// Create a new Eskiz gateway
    ///
    /// `api_key` is the account email and `api_secret` its password.
    pub fn new(config: &SmsConfig) -> Result<Self, InfrastructureError> {
        config.validate()?;
        if config.api_key.is_empty() || config.api_secret.is_empty() {
            return Err(InfrastructureError::Config(
                "ESKIZ_EMAIL and ESKIZ_PASSWORD must be set".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        let base_url = config
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
            .to_string();

        info!("Eskiz SMS gateway initialized with sender: {}", config.from_number);

        Ok(Self {
            client,
            base_url,
            email: config.api_key.clone(),
            password: config.api_secret.clone(),
            sender: config.from_number.clone(),
            token: RwLock::new(None),
        })
    }

    /// Cached token, logging in when there is none or it is too old
    async fn token(&self) -> Result<String, InfrastructureError> {
        {
            let cached = self.token.read().await;
            if let Some(token) = cached.as_ref().filter(|t| t.expires_at > Instant::now()) {
                return Ok(token.value.clone());
            }
        }

        let mut cached = self.token.write().await;
        // Another task may have logged in while we waited for the lock
        if let Some(token) = cached.as_ref().filter(|t| t.expires_at > Instant::now()) {
            return Ok(token.value.clone());
        }

        let value = self.login().await?;
        *cached = Some(CachedToken {
            value: value.clone(),
            expires_at: Instant::now() + TOKEN_LIFETIME,
        });
        Ok(value)
    }

    async fn login(&self) -> Result<String, InfrastructureError> {
        debug!("Requesting Eskiz API token");

        let response = self
            .client
            .post(format!("{}{}", self.base_url, LOGIN_PATH))
            .form(&[("email", self.email.as_str()), ("password", self.password.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(InfrastructureError::Sms(format!(
                "Eskiz login failed with HTTP {}",
                status.as_u16()
            )));
        }

        let body: LoginResponse = response.json().await.map_err(|e| {
            InfrastructureError::Sms(format!("Eskiz login response has no token: {}", e))
        })?;

        if body.data.token.is_empty() {
            return Err(InfrastructureError::Sms(
                "Eskiz login returned an empty token".to_string(),
            ));
        }

        info!("Eskiz API token refreshed");
        Ok(body.data.token)
    }

    async fn clear_token(&self) {
        *self.token.write().await = None;
    }

    async fn send_once(
        &self,
        token: &str,
        phone: &CanonicalPhone,
        message: &str,
    ) -> Result<SendAttempt, InfrastructureError> {
        let request = SendRequest {
            mobile_phone: phone.digits(),
            message,
            from: &self.sender,
        };

        let response = self
            .client
            .post(format!("{}{}", self.base_url, SEND_PATH))
            .bearer_auth(token)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Ok(SendAttempt::Unauthorized);
        }
        if !status.is_success() {
            return Err(InfrastructureError::Sms(format!(
                "Eskiz send failed with HTTP {}",
                status.as_u16()
            )));
        }

        let body: SendResponse = response.json().await.unwrap_or(SendResponse { id: None });
        let message_id = match body.id {
            Some(serde_json::Value::String(id)) => id,
            Some(serde_json::Value::Number(id)) => id.to_string(),
            _ => format!("eskiz-{}", Uuid::new_v4()),
        };

        Ok(SendAttempt::Sent(message_id))
    }

    async fn deliver(
        &self,
        phone: &CanonicalPhone,
        message: &str,
    ) -> Result<String, InfrastructureError> {
        let token = self.token().await?;
        if let SendAttempt::Sent(id) = self.send_once(&token, phone, message).await? {
            return Ok(id);
        }

        warn!(
            phone = %phone.masked(),
            "Eskiz rejected the cached token, logging in again"
        );
        self.clear_token().await;

        let token = self.token().await?;
        match self.send_once(&token, phone, message).await? {
            SendAttempt::Sent(id) => Ok(id),
            SendAttempt::Unauthorized => {
                self.clear_token().await;
                Err(InfrastructureError::Sms(
                    "Eskiz rejected a freshly issued token".to_string(),
                ))
            }
        }
    }
}

#[async_trait]
impl SmsGateway for EskizSmsGateway {
    async fn send(&self, phone: &CanonicalPhone, message: &str) -> DeliveryReport {
        match self.deliver(phone, message).await {
            Ok(message_id) => {
                info!(
                    target: "sms_gateway",
                    provider = "eskiz",
                    phone = %phone.masked(),
                    message_id = %message_id,
                    "SMS sent successfully"
                );
                DeliveryReport::Delivered { message_id }
            }
            Err(e) => {
                error!(
                    target: "sms_gateway",
                    provider = "eskiz",
                    phone = %phone.masked(),
                    error = %e,
                    "Failed to send SMS"
                );
                DeliveryReport::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    fn provider_name(&self) -> &str {
        "eskiz"
    }
}
