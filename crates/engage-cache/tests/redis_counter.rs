//! Integration tests for the Redis counter store
//!
//! These tests require a running Redis server.
//! Set REDIS_URL environment variable before running:
//!
//! ```bash
//! export REDIS_URL="redis://127.0.0.1:6379"
//! cargo test -p engage-cache --test redis_counter
//! ```

use std::sync::Arc;

use chrono::Utc;

use engage_cache::{RedisCounterStore, RedisPool, RedisPoolConfig};
use engage_core::entities::CounterDelta;
use engage_core::traits::CounterStore;
use engage_core::value_objects::ProductId;

/// Helper to create a counter store against a live Redis
async fn get_test_store() -> Option<RedisCounterStore> {
    let url = std::env::var("REDIS_URL").ok()?;
    let pool = RedisPool::new(RedisPoolConfig {
        url,
        max_connections: 8,
    })
    .ok()?;
    pool.health_check().await.ok()?;
    Some(RedisCounterStore::new(pool))
}

/// Product id unlikely to collide with earlier runs
fn test_product() -> ProductId {
    ProductId::new(Utc::now().timestamp_micros()).unwrap()
}

#[tokio::test]
async fn test_redis_delta_clamps_and_versions() {
    let Some(store) = get_test_store().await else {
        eprintln!("Skipping test: REDIS_URL not set");
        return;
    };
    let product = test_product();

    let outcome = store
        .apply_delta(product, CounterDelta::Decrement)
        .await
        .unwrap();
    assert_eq!(outcome.count.count, 0);
    assert!(outcome.clamped);
    assert_eq!(outcome.count.version, 1);

    let outcome = store
        .apply_delta(product, CounterDelta::Increment)
        .await
        .unwrap();
    assert_eq!(outcome.count.count, 1);
    assert!(!outcome.clamped);

    let read = store.get_count(product).await.unwrap();
    assert_eq!(read.count, 1);
    assert_eq!(read.version, 2);

    let snapshot = store.snapshot().await.unwrap();
    assert!(snapshot.iter().any(|c| c.product_id == product && c.count == 1));
}

#[tokio::test]
async fn test_redis_concurrent_increments() {
    let Some(store) = get_test_store().await else {
        eprintln!("Skipping test: REDIS_URL not set");
        return;
    };
    let store = Arc::new(store);
    let product = test_product();

    let handles: Vec<_> = (0..50)
        .map(|_| {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                store
                    .apply_delta(product, CounterDelta::Increment)
                    .await
                    .unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(store.get_count(product).await.unwrap().count, 50);

    let outcome = store.compensate(product, -60).await.unwrap();
    assert_eq!(outcome.count.count, 0);
    assert!(outcome.clamped);
}
