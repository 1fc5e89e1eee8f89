//! Unit tests for the dual-path store

use chrono::{Duration, Utc};
use std::sync::Arc;

use otp_shared::OtpConfig;

use crate::domain::entities::OtpRecord;
use crate::domain::value_objects::normalize;
use crate::errors::StoreError;
use crate::repositories::otp::{AttemptUpdate, InMemoryOtpRepository, OtpRepository, UpsertOutcome};
use crate::services::otp::mock::MockOtpCache;
use crate::services::otp::{DualPathStore, RecordSource};

use super::PHONE;

fn fast_config() -> OtpConfig {
    let mut config = OtpConfig::default();
    config.cache_timeout_ms = 20;
    config.store_timeout_ms = 50;
    config
}

fn setup() -> (
    Arc<InMemoryOtpRepository>,
    Arc<MockOtpCache>,
    DualPathStore<InMemoryOtpRepository, MockOtpCache>,
) {
    let repository = Arc::new(InMemoryOtpRepository::new());
    let cache = Arc::new(MockOtpCache::new());
    let store = DualPathStore::new(repository.clone(), cache.clone(), &fast_config());
    (repository, cache, store)
}

fn fresh_record() -> OtpRecord {
    OtpRecord::issue(
        normalize(PHONE).unwrap(),
        "123456".to_string(),
        Utc::now(),
        Duration::seconds(300),
    )
}

#[tokio::test]
async fn test_put_writes_both_tiers() {
    let (repository, cache, store) = setup();
    let record = fresh_record();

    let outcome = store.put(&record, Duration::seconds(60)).await.unwrap();
    assert_eq!(outcome, UpsertOutcome::Stored(record.clone()));

    assert_eq!(repository.find(&record.phone).await.unwrap(), Some(record.clone()));
    assert_eq!(cache.peek(&record.phone), Some(record.clone()));

    let lookup = store.get(&record.phone).await.unwrap().unwrap();
    assert_eq!(lookup.source, RecordSource::Cache);
    assert_eq!(lookup.record, record);
}

#[tokio::test]
async fn test_put_refused_during_cooldown_leaves_cache_alone() {
    let (_, cache, store) = setup();
    let first = fresh_record();
    store.put(&first, Duration::seconds(60)).await.unwrap();

    let second = fresh_record();
    let outcome = store.put(&second, Duration::seconds(60)).await.unwrap();
    assert!(matches!(outcome, UpsertOutcome::CooldownActive { .. }));
    assert_eq!(cache.peek(&first.phone).unwrap().id, first.id);
}

#[tokio::test]
async fn test_cache_failure_is_absorbed() {
    let (_, cache, store) = setup();
    cache.set_unavailable(true);
    let record = fresh_record();

    store.put(&record, Duration::seconds(60)).await.unwrap();

    let lookup = store.get(&record.phone).await.unwrap().unwrap();
    assert_eq!(lookup.source, RecordSource::Durable);
    assert_eq!(lookup.record.code, "123456");
}

#[tokio::test]
async fn test_slow_cache_is_treated_as_miss() {
    let (_, cache, store) = setup();
    let record = fresh_record();
    store.put(&record, Duration::seconds(60)).await.unwrap();

    cache.set_latency(std::time::Duration::from_millis(200));
    let lookup = store.get(&record.phone).await.unwrap().unwrap();
    assert_eq!(lookup.source, RecordSource::Durable);
}

#[tokio::test]
async fn test_durable_failure_aborts_put() {
    let (repository, cache, store) = setup();
    repository.set_unavailable(true);
    let record = fresh_record();

    let result = store.put(&record, Duration::seconds(60)).await;
    assert!(matches!(result, Err(StoreError::Unavailable(_))));
    assert!(cache.peek(&record.phone).is_none());
}

#[tokio::test]
async fn test_slow_durable_store_times_out() {
    let (repository, _, store) = setup();
    repository.set_latency(std::time::Duration::from_millis(500));

    let result = store.get(&normalize(PHONE).unwrap()).await;
    assert_eq!(result.unwrap_err(), StoreError::Timeout(50));
}

#[tokio::test]
async fn test_cache_miss_repopulates_cache() {
    let (repository, cache, store) = setup();
    let record = fresh_record();
    repository.insert_raw(record.clone()).await;
    assert!(cache.peek(&record.phone).is_none());

    let lookup = store.get(&record.phone).await.unwrap().unwrap();
    assert_eq!(lookup.source, RecordSource::Durable);
    assert_eq!(cache.peek(&record.phone), Some(record));
}

#[tokio::test]
async fn test_expired_record_is_removed_on_read() {
    let (repository, cache, store) = setup();
    let record = OtpRecord::issue(
        normalize(PHONE).unwrap(),
        "123456".to_string(),
        Utc::now() - Duration::seconds(400),
        Duration::seconds(300),
    );
    repository.insert_raw(record.clone()).await;
    cache.insert_raw(record.clone(), std::time::Duration::from_secs(60));

    assert!(store.get(&record.phone).await.unwrap().is_none());
    assert!(repository.find(&record.phone).await.unwrap().is_none());
    assert!(cache.peek(&record.phone).is_none());
}

#[tokio::test]
async fn test_consumed_record_is_absent() {
    let (repository, _, store) = setup();
    let mut record = fresh_record();
    record.consumed = true;
    repository.insert_raw(record.clone()).await;

    assert!(store.get(&record.phone).await.unwrap().is_none());
    // kept for the cooldown
    assert!(repository.find(&record.phone).await.unwrap().is_some());
}

#[tokio::test]
async fn test_increment_mirrors_authoritative_count() {
    let (_, cache, store) = setup();
    let record = fresh_record();
    store.put(&record, Duration::seconds(60)).await.unwrap();

    let update = store.increment_attempts(&record, 3).await.unwrap();
    assert_eq!(update, AttemptUpdate::Incremented(1));
    assert_eq!(cache.peek(&record.phone).unwrap().attempts, 1);
}

#[tokio::test]
async fn test_increment_on_gone_issuance_evicts_cache() {
    let (repository, cache, store) = setup();
    let stale = fresh_record();
    cache.insert_raw(stale.clone(), std::time::Duration::from_secs(60));
    repository.insert_raw(fresh_record()).await;

    let update = store.increment_attempts(&stale, 3).await.unwrap();
    assert_eq!(update, AttemptUpdate::Gone);
    assert!(cache.peek(&stale.phone).is_none());
}

#[tokio::test]
async fn test_invalidate_marks_consumed_and_evicts() {
    let (repository, cache, store) = setup();
    let record = fresh_record();
    store.put(&record, Duration::seconds(60)).await.unwrap();

    store.invalidate(&record).await.unwrap();

    assert!(cache.peek(&record.phone).is_none());
    assert!(repository.find(&record.phone).await.unwrap().unwrap().consumed);
    assert!(store.get(&record.phone).await.unwrap().is_none());
}

#[tokio::test]
async fn test_consume_evicts_cache_for_winner_and_loser() {
    let (_, cache, store) = setup();
    let record = fresh_record();
    store.put(&record, Duration::seconds(60)).await.unwrap();

    assert!(store.consume(&record, 3).await.unwrap());
    assert!(cache.peek(&record.phone).is_none());

    cache.insert_raw(record.clone(), std::time::Duration::from_secs(60));
    assert!(!store.consume(&record, 3).await.unwrap());
    assert!(cache.peek(&record.phone).is_none());
}
