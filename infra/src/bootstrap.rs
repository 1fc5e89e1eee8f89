//! Wiring of the concrete backends into a ready OTP manager
//!
//! `OtpInfrastructure::connect` opens the MySQL pool, prepares the
//! `otp_codes` table, connects the Redis cache when enabled and picks the SMS
//! gateway. A Redis outage at startup downgrades to an uncached store instead
//! of failing; the database is required.

use std::sync::Arc;

use otp_core::{
    DisabledCache, OtpCache, OtpCleanupConfig, OtpCleanupService, OtpManager, SmsGateway,
};
use otp_shared::{ConfigError, OtpConfig};

use crate::cache::{RedisClient, RedisOtpCache};
use crate::config::{AppConfig, CacheConfig};
use crate::database::{DatabasePool, MySqlOtpRepository};
use crate::sms::create_sms_gateway;
use crate::InfrastructureError;

/// OTP manager over the production backends
pub type OtpService = OtpManager<MySqlOtpRepository, dyn OtpCache, dyn SmsGateway>;

/// Connected backends for the OTP subsystem
pub struct OtpInfrastructure {
    pub pool: DatabasePool,
    pub repository: Arc<MySqlOtpRepository>,
    pub cache: Arc<dyn OtpCache>,
    pub sms_gateway: Arc<dyn SmsGateway>,
    otp: OtpConfig,
}

impl OtpInfrastructure {
    /// Connect every backend named in `config`
    ///
    /// # Arguments
    ///
    /// * `config` - Application configuration
    ///
    /// # Returns
    ///
    /// * `Ok(OtpInfrastructure)` - Backends ready for use
    /// * `Err(InfrastructureError)` - Invalid OTP settings or database unreachable
    pub async fn connect(config: &AppConfig) -> Result<Self, InfrastructureError> {
        config.otp.validate()?;

        let pool = DatabasePool::new(&config.database).await?;
        let repository = Arc::new(MySqlOtpRepository::new(pool.get_pool().clone()));
        repository.ensure_schema().await?;

        let cache = connect_cache(&config.cache).await;
        let sms_gateway = create_sms_gateway(&config.sms);

        tracing::info!(
            environment = ?config.environment,
            sms_provider = sms_gateway.provider_name(),
            "OTP infrastructure ready"
        );

        Ok(Self {
            pool,
            repository,
            cache,
            sms_gateway,
            otp: config.otp.clone(),
        })
    }

    /// Build the OTP manager over these backends
    pub fn manager(&self) -> Result<OtpService, ConfigError> {
        OtpManager::new(
            self.repository.clone(),
            self.cache.clone(),
            self.sms_gateway.clone(),
            self.otp.clone(),
        )
    }

    /// Build the expired-record sweep over the durable repository
    pub fn cleanup_service(&self) -> OtpCleanupService<MySqlOtpRepository> {
        OtpCleanupService::new(self.repository.clone(), OtpCleanupConfig::from(&self.otp))
    }

    /// Check that the durable tier answers
    pub async fn health_check(&self) -> Result<(), InfrastructureError> {
        self.pool.health_check().await
    }

    /// Close the database pool
    pub async fn shutdown(&self) {
        self.pool.close().await;
    }
}

/// Redis-backed cache, or a disabled cache when Redis is off or unreachable
pub async fn connect_cache(config: &CacheConfig) -> Arc<dyn OtpCache> {
    if !config.enabled {
        tracing::info!("OTP cache disabled, reads go to the database");
        return Arc::new(DisabledCache);
    }

    match RedisClient::new(config.clone()).await {
        Ok(client) => Arc::new(RedisOtpCache::new(client)),
        Err(e) => {
            tracing::warn!(
                error = %e,
                event = "otp_cache_degraded",
                "Redis unavailable at startup, running without the OTP cache"
            );
            Arc::new(DisabledCache)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_cache_config_skips_redis() {
        let config = CacheConfig {
            enabled: false,
            ..CacheConfig::default()
        };
        let cache = connect_cache(&config).await;

        let phone = otp_core::normalize("+998901234567").unwrap();
        assert!(cache.get(&phone).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unreachable_redis_degrades_to_disabled_cache() {
        let config = CacheConfig {
            url: "redis://127.0.0.1:1".to_string(),
            connection_timeout: 1,
            max_retries: 1,
            retry_delay_ms: 10,
            ..CacheConfig::default()
        };
        let cache = connect_cache(&config).await;

        let phone = otp_core::normalize("+998901234567").unwrap();
        assert!(cache.get(&phone).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_connect_rejects_invalid_otp_settings() {
        let mut config = AppConfig::development();
        config.otp.code_length = 2;

        let result = OtpInfrastructure::connect(&config).await;
        assert!(matches!(result, Err(InfrastructureError::InvalidSettings(_))));
    }
}
