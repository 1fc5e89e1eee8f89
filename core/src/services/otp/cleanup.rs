//! OTP cleanup service for periodic removal of expired records
//!
//! Expiry is enforced lazily on every read, so this sweep only keeps the
//! durable table small. Rows are kept for a retention window after expiry.

use chrono::Utc;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use otp_shared::OtpConfig;

use crate::errors::StoreError;
use crate::repositories::otp::OtpRepository;

/// Configuration for the OTP cleanup service
#[derive(Debug, Clone)]
pub struct OtpCleanupConfig {
    /// How often to run cleanup
    pub interval: std::time::Duration,
    /// How long expired rows are kept before deletion
    pub retention: chrono::Duration,
    /// Whether to enable automatic cleanup
    pub enabled: bool,
}

impl Default for OtpCleanupConfig {
    fn default() -> Self {
        Self {
            interval: std::time::Duration::from_secs(600),
            retention: chrono::Duration::hours(1),
            enabled: true,
        }
    }
}

impl From<&OtpConfig> for OtpCleanupConfig {
    fn from(config: &OtpConfig) -> Self {
        Self {
            interval: config.sweep_interval(),
            retention: chrono::Duration::seconds(config.sweep_retention_seconds),
            enabled: config.sweep_interval_seconds > 0,
        }
    }
}

/// Service for purging expired OTP records
pub struct OtpCleanupService<R: OtpRepository + ?Sized + 'static> {
    repository: Arc<R>,
    config: OtpCleanupConfig,
}

impl<R: OtpRepository + ?Sized> OtpCleanupService<R> {
    pub fn new(repository: Arc<R>, config: OtpCleanupConfig) -> Self {
        Self { repository, config }
    }

    /// Run a single cleanup cycle
    ///
    /// # Returns
    /// * `Ok(CleanupResult)` - Summary of cleanup operations
    /// * `Err(StoreError)` - If the durable store rejected the purge
    pub async fn run_cleanup(&self) -> Result<CleanupResult, StoreError> {
        if !self.config.enabled {
            return Ok(CleanupResult::default());
        }

        let cutoff = Utc::now() - self.config.retention;
        let deleted = self.repository.purge_expired(cutoff).await?;

        info!(
            deleted = deleted,
            cutoff = %cutoff,
            event = "otp_sweep_completed",
            "OTP cleanup completed"
        );

        Ok(CleanupResult {
            expired_records_deleted: deleted,
        })
    }

    /// Start the cleanup service as a background task
    ///
    /// Returns `None` when cleanup is disabled.
    pub fn start_background_task(self: Arc<Self>) -> Option<JoinHandle<()>> {
        if !self.config.enabled {
            warn!("OTP cleanup service is disabled");
            return None;
        }

        Some(tokio::spawn(async move {
            info!(
                interval_seconds = self.config.interval.as_secs(),
                "OTP cleanup service started"
            );

            let mut interval_timer = tokio::time::interval(self.config.interval);

            loop {
                interval_timer.tick().await;

                if let Err(e) = self.run_cleanup().await {
                    error!(error = %e, "OTP cleanup cycle failed");
                }
            }
        }))
    }
}

/// Result of a cleanup operation
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanupResult {
    /// Number of expired records deleted
    pub expired_records_deleted: u64,
}
