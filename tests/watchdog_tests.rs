//! Background lease renewal.

use std::sync::Arc;
use std::time::Duration;

use lease_lock_core::prelude::*;

mod common;
use common::mock_store::MockLockStore;

const TTL: Duration = Duration::from_secs(2);
const INTERVAL: Duration = Duration::from_secs(1);
const REFRESH_TIMEOUT: Duration = Duration::from_millis(200);

async fn setup() -> (Arc<MockLockStore>, LockHandle<MockLockStore>) {
    let store = Arc::new(MockLockStore::new());
    let client = LockClient::from_shared(store.clone());
    let handle = client.try_acquire("jobs", "owner", TTL).await.unwrap();
    (store, handle)
}

#[tokio::test(start_paused = true)]
async fn test_renewal_keeps_lock_past_ttl() {
    let (store, handle) = setup().await;
    let watchdog = handle.start_auto_renew(Duration::from_millis(500), REFRESH_TIMEOUT);

    tokio::time::sleep(TTL * 3).await;
    assert_eq!(store.inner().token("jobs").as_deref(), Some("owner"));
    assert_eq!(watchdog.state(), WatchdogState::Running);

    handle.release(&LockContext::background()).await.unwrap();
    watchdog.join().await.unwrap();
    assert!(store.inner().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_no_refresh_after_stop() {
    let (store, handle) = setup().await;
    let mut watchdog = handle.start_auto_renew(INTERVAL, REFRESH_TIMEOUT);

    tokio::time::sleep(Duration::from_millis(3500)).await;
    assert_eq!(store.refresh_calls(), 3);

    handle.release(&LockContext::background()).await.unwrap();
    assert_eq!(watchdog.exited().await, WatchdogState::Stopped);

    tokio::time::sleep(INTERVAL * 5).await;
    assert_eq!(store.refresh_calls(), 3);
    assert!(watchdog.is_finished());
    watchdog.join().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_timed_out_refresh_retries_immediately() {
    let (store, handle) = setup().await;
    store.stall_refreshes(2);
    let watchdog = handle.start_auto_renew(INTERVAL, REFRESH_TIMEOUT);

    // Tick at 1s stalls, retry at 1.2s stalls, retry at 1.4s succeeds.
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(store.refresh_calls(), 3);
    assert_eq!(watchdog.state(), WatchdogState::Running);
    assert_eq!(
        store.inner().remaining_ttl("jobs"),
        Some(TTL - Duration::from_millis(100))
    );

    handle.stop_renewal();
    watchdog.join().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_lost_lock_fails_watchdog() {
    let (store, handle) = setup().await;
    let mut watchdog = handle.start_auto_renew(INTERVAL, REFRESH_TIMEOUT);

    // Someone else removes the record, e.g. after it expired during a pause.
    store.inner().release("jobs", "owner").await.unwrap();

    assert_eq!(watchdog.exited().await, WatchdogState::Failed);
    let err = watchdog.join().await.unwrap_err();
    assert!(err.is_lock_not_held());
    assert_eq!(store.refresh_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_store_error_fails_watchdog() {
    let (store, handle) = setup().await;
    store.fail_refreshes(1);
    let mut watchdog = handle.start_auto_renew(INTERVAL, REFRESH_TIMEOUT);

    assert_eq!(watchdog.exited().await, WatchdogState::Failed);
    assert!(matches!(watchdog.join().await, Err(LockError::Store(_))));
}

#[tokio::test(start_paused = true)]
async fn test_dropping_handle_stops_watchdog() {
    let (store, handle) = setup().await;
    let mut watchdog = handle.start_auto_renew(INTERVAL, REFRESH_TIMEOUT);

    tokio::time::sleep(Duration::from_millis(1500)).await;
    drop(handle);

    assert_eq!(watchdog.exited().await, WatchdogState::Stopped);
    let calls = store.refresh_calls();
    tokio::time::sleep(INTERVAL * 3).await;
    assert_eq!(store.refresh_calls(), calls);
}

#[tokio::test(start_paused = true)]
async fn test_inline_auto_renew_returns_on_stop() {
    let (store, handle) = setup().await;

    let (renewal, ()) = tokio::join!(handle.auto_renew(INTERVAL, REFRESH_TIMEOUT), async {
        tokio::time::sleep(Duration::from_millis(2500)).await;
        handle.stop_renewal();
    });

    renewal.unwrap();
    assert_eq!(store.refresh_calls(), 2);
    assert_eq!(store.release_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_watchdog_started_after_release_fails() {
    let (store, handle) = setup().await;
    handle.release(&LockContext::background()).await.unwrap();

    let mut watchdog = handle.start_auto_renew(INTERVAL, REFRESH_TIMEOUT);
    assert_eq!(watchdog.exited().await, WatchdogState::Failed);
    let err = watchdog.join().await.unwrap_err();
    assert!(err.is_lock_not_held());

    let err = handle.auto_renew(INTERVAL, REFRESH_TIMEOUT).await.unwrap_err();
    assert!(err.is_lock_not_held());
    assert_eq!(store.refresh_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_zero_interval_fails_watchdog_with_configuration_error() {
    let (store, handle) = setup().await;

    let mut watchdog = handle.start_auto_renew(Duration::ZERO, REFRESH_TIMEOUT);
    assert_eq!(watchdog.exited().await, WatchdogState::Failed);
    assert!(matches!(
        watchdog.join().await,
        Err(LockError::Configuration(_))
    ));
    assert_eq!(store.refresh_calls(), 0);
    assert_eq!(store.inner().token("jobs").as_deref(), Some("owner"));
}
