//! Tests for refresh deduplication, lock auto-release and the read path

use serde_json::json;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tickcache::{CacheReader, CacheSettings, Freshness, ProducerError, RefreshCoordinator, TieredCache};

const TTL: Duration = Duration::from_secs(1800);

fn setup() -> (Arc<TieredCache>, RefreshCoordinator) {
    let _ = env_logger::builder().is_test(true).try_init();
    let settings = CacheSettings::default();
    let cache = Arc::new(TieredCache::new(&settings));
    let coordinator = RefreshCoordinator::new(cache.clone(), settings.refresh_lock_timeout);
    (cache, coordinator)
}

#[tokio::test(start_paused = true)]
async fn concurrent_triggers_invoke_producer_once() {
    let (cache, coordinator) = setup();
    let calls = Arc::new(AtomicU32::new(0));
    let (tx, rx) = tokio::sync::oneshot::channel();

    let slow_calls = calls.clone();
    let first = coordinator.trigger_background("breadth", TTL, async move {
        slow_calls.fetch_add(1, Ordering::SeqCst);
        Ok(rx.await.expect("sender dropped"))
    });

    let fast_calls = calls.clone();
    let second = coordinator.trigger_background("breadth", TTL, async move {
        fast_calls.fetch_add(1, Ordering::SeqCst);
        Ok(json!("should never run"))
    });

    assert!(first);
    assert!(!second);
    assert!(coordinator.is_refreshing("breadth"));

    tokio::task::yield_now().await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    tx.send(json!({ "score": 68 })).expect("receiver alive");
    tokio::task::yield_now().await;
    tokio::task::yield_now().await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(!coordinator.is_refreshing("breadth"));
    assert_eq!(cache.get("breadth").unwrap().as_ref(), &json!({ "score": 68 }));
}

#[tokio::test(start_paused = true)]
async fn stuck_lock_auto_releases_after_timeout() {
    let (_cache, coordinator) = setup();
    let calls = Arc::new(AtomicU32::new(0));

    let hung_calls = calls.clone();
    let fired = coordinator.trigger_background("breadth", TTL, async move {
        hung_calls.fetch_add(1, Ordering::SeqCst);
        std::future::pending::<Result<tickcache::Json, ProducerError>>().await
    });
    assert!(fired);

    tokio::task::yield_now().await;
    assert!(coordinator.is_refreshing("breadth"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // Default lock timeout is 120s; the producer never resolves.
    tokio::time::advance(Duration::from_secs(121)).await;
    tokio::task::yield_now().await;

    assert!(!coordinator.is_refreshing("breadth"));

    // A new attempt is accepted, not a no-op.
    let retry_calls = calls.clone();
    let refired = coordinator.trigger_background("breadth", TTL, async move {
        retry_calls.fetch_add(1, Ordering::SeqCst);
        Ok(json!(1))
    });
    assert!(refired);
    tokio::task::yield_now().await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn producer_errors_are_absorbed() {
    let (cache, coordinator) = setup();
    cache.set("breadth", json!({ "score": 40 }), Duration::from_secs(1));
    tokio::time::advance(Duration::from_secs(2)).await;

    let fired = coordinator.trigger_background("breadth", TTL, async {
        Err(ProducerError::Upstream("rate limited".to_string()))
    });
    assert!(fired);
    tokio::task::yield_now().await;
    tokio::task::yield_now().await;

    // Lock released, stale value untouched, nothing propagated.
    assert!(!coordinator.is_refreshing("breadth"));
    assert_eq!(
        cache.get_stale("breadth").unwrap().as_ref(),
        &json!({ "score": 40 })
    );
}

#[tokio::test(start_paused = true)]
async fn clear_refreshing_cancels_the_timeout() {
    let (_cache, coordinator) = setup();

    coordinator.mark_refreshing("k");
    assert!(coordinator.is_refreshing("k"));

    coordinator.clear_refreshing("k");
    assert!(!coordinator.is_refreshing("k"));

    // Re-mark and make sure the old (cancelled) timer cannot release the
    // new lock early.
    tokio::time::advance(Duration::from_secs(60)).await;
    coordinator.mark_refreshing("k");
    tokio::time::advance(Duration::from_secs(90)).await;
    tokio::task::yield_now().await;
    assert!(coordinator.is_refreshing("k"));

    tokio::time::advance(Duration::from_secs(31)).await;
    tokio::task::yield_now().await;
    assert!(!coordinator.is_refreshing("k"));
}

#[tokio::test(start_paused = true)]
async fn stale_value_served_while_revalidating() {
    // The market-breadth scenario: a value expires from the primary tier,
    // keeps serving stale, and a background refresh replaces it.
    let (cache, coordinator) = setup();
    let reader = CacheReader::new(cache.clone(), coordinator.clone());

    cache.set("market_breadth", json!({ "score": 72 }), TTL);

    tokio::time::advance(Duration::from_secs(1801)).await;
    assert!(cache.get("market_breadth").is_none());

    let lookup = reader
        .fetch("market_breadth", TTL, || async { Ok(json!({ "score": 75 })) })
        .await;
    assert_eq!(lookup.freshness, Freshness::Stale);
    assert_eq!(lookup.value.unwrap().as_ref(), &json!({ "score": 72 }));

    tokio::task::yield_now().await;
    tokio::task::yield_now().await;

    assert_eq!(
        cache.get("market_breadth").unwrap().as_ref(),
        &json!({ "score": 75 })
    );
}

#[tokio::test(start_paused = true)]
async fn cold_miss_recomputes_synchronously() {
    let (cache, coordinator) = setup();
    let reader = CacheReader::new(cache.clone(), coordinator);

    let lookup = reader
        .fetch("quote:MSFT", TTL, || async { Ok(json!({ "price": 430.1 })) })
        .await;

    assert_eq!(lookup.freshness, Freshness::Fresh);
    assert_eq!(lookup.value.unwrap().as_ref(), &json!({ "price": 430.1 }));
    assert!(cache.get("quote:MSFT").is_some());
    assert!(cache.get_stale("quote:MSFT").is_some());
}

#[tokio::test(start_paused = true)]
async fn cold_miss_with_failing_producer_returns_missing() {
    let (cache, coordinator) = setup();
    let reader = CacheReader::new(cache.clone(), coordinator.clone());

    let lookup = reader
        .fetch("quote:MSFT", TTL, || async {
            Err(ProducerError::Timeout(Duration::from_secs(10)))
        })
        .await;

    assert_eq!(lookup.freshness, Freshness::Missing);
    assert!(lookup.value.is_none());
    assert!(cache.get("quote:MSFT").is_none());
}
