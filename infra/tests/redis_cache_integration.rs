//! Integration tests for the Redis-backed OTP cache
//!
//! Require a running Redis: `REDIS_URL` (default `redis://127.0.0.1:6379`).

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    use otp_core::{normalize, CanonicalPhone, OtpCache, OtpRecord};
    use otp_infra::cache::{CacheConfig, RedisClient, RedisOtpCache};

    async fn cache() -> (RedisClient, RedisOtpCache) {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
        let config = CacheConfig::new(url).with_prefix(format!("otp_test_{}", Uuid::new_v4()));
        let client = RedisClient::new(config)
            .await
            .expect("Failed to create Redis client");
        (client.clone(), RedisOtpCache::new(client))
    }

    fn unique_phone() -> CanonicalPhone {
        let suffix = Uuid::new_v4().as_u128() % 10_000_000;
        normalize(&format!("+99890{:07}", suffix)).unwrap()
    }

    fn record(phone: CanonicalPhone) -> OtpRecord {
        OtpRecord::issue(phone, "654321".to_string(), Utc::now(), Duration::seconds(300))
    }

    #[tokio::test]
    #[ignore] // Requires Redis to be running
    async fn test_set_get_delete() {
        let (_, cache) = cache().await;
        let record = record(unique_phone());

        cache
            .set(&record, std::time::Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(cache.get(&record.phone).await.unwrap(), Some(record.clone()));

        cache.delete(&record.phone).await.unwrap();
        assert_eq!(cache.get(&record.phone).await.unwrap(), None);
    }

    #[tokio::test]
    #[ignore] // Requires Redis to be running
    async fn test_entry_expires_with_ttl() {
        let (_, cache) = cache().await;
        let record = record(unique_phone());

        cache
            .set(&record, std::time::Duration::from_secs(1))
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(2100)).await;

        assert_eq!(cache.get(&record.phone).await.unwrap(), None);
    }

    #[tokio::test]
    #[ignore] // Requires Redis to be running
    async fn test_unreadable_entry_is_dropped() {
        let (client, cache) = cache().await;
        let phone = unique_phone();
        let key = client.make_key(&otp_infra::cache::otp_cache::record_key(&phone));

        client.set_with_expiry(&key, "not json", 60).await.unwrap();

        assert!(cache.get(&phone).await.is_err());
        assert_eq!(client.get(&key).await.unwrap(), None);
    }

    #[tokio::test]
    #[ignore] // Requires Redis to be running
    async fn test_health_check() {
        let (client, _) = cache().await;
        client.health_check().await.unwrap();
    }
}
