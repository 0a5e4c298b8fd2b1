//! Instrumented store for observing how the client drives the backend.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use lease_lock_core::error::{LockError, LockResult};
use lease_lock_core::memory::MemoryLockStore;
use lease_lock_core::store::{AcquireOutcome, LockStore, RefreshOutcome, ReleaseOutcome};

/// How long an injected stall lasts; far longer than any test timeout.
const STALL: Duration = Duration::from_secs(3600);

/// Wraps [`MemoryLockStore`], counting calls and injecting stalls or errors.
#[derive(Default)]
pub struct MockLockStore {
    inner: MemoryLockStore,
    set_calls: AtomicUsize,
    acquire_calls: AtomicUsize,
    refresh_calls: AtomicUsize,
    release_calls: AtomicUsize,
    stalled_acquires: AtomicUsize,
    failing_acquires: AtomicUsize,
    stalled_refreshes: AtomicUsize,
    failing_refreshes: AtomicUsize,
}

/// Decrements `counter` if positive, returning whether it was.
fn take(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

fn injected(op: &str) -> LockError {
    LockError::store(std::io::Error::other(format!("injected {op} failure")))
}

impl MockLockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inner(&self) -> &MemoryLockStore {
        &self.inner
    }

    pub fn acquire_calls(&self) -> usize {
        self.acquire_calls.load(Ordering::SeqCst)
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn release_calls(&self) -> usize {
        self.release_calls.load(Ordering::SeqCst)
    }

    pub fn set_calls(&self) -> usize {
        self.set_calls.load(Ordering::SeqCst)
    }

    /// The next `n` acquires hang until cancelled.
    pub fn stall_acquires(&self, n: usize) {
        self.stalled_acquires.store(n, Ordering::SeqCst);
    }

    /// The next `n` acquires fail with a store error.
    pub fn fail_acquires(&self, n: usize) {
        self.failing_acquires.store(n, Ordering::SeqCst);
    }

    /// The next `n` refreshes hang until cancelled.
    pub fn stall_refreshes(&self, n: usize) {
        self.stalled_refreshes.store(n, Ordering::SeqCst);
    }

    /// The next `n` refreshes fail with a store error.
    pub fn fail_refreshes(&self, n: usize) {
        self.failing_refreshes.store(n, Ordering::SeqCst);
    }
}

impl LockStore for MockLockStore {
    async fn set_if_absent(&self, key: &str, token: &str, ttl: Duration) -> LockResult<bool> {
        self.set_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.set_if_absent(key, token, ttl).await
    }

    async fn acquire(&self, key: &str, token: &str, ttl: Duration) -> LockResult<AcquireOutcome> {
        self.acquire_calls.fetch_add(1, Ordering::SeqCst);
        if take(&self.stalled_acquires) {
            tokio::time::sleep(STALL).await;
        }
        if take(&self.failing_acquires) {
            return Err(injected("acquire"));
        }
        self.inner.acquire(key, token, ttl).await
    }

    async fn refresh(&self, key: &str, token: &str, ttl: Duration) -> LockResult<RefreshOutcome> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        if take(&self.stalled_refreshes) {
            tokio::time::sleep(STALL).await;
        }
        if take(&self.failing_refreshes) {
            return Err(injected("refresh"));
        }
        self.inner.refresh(key, token, ttl).await
    }

    async fn release(&self, key: &str, token: &str) -> LockResult<ReleaseOutcome> {
        self.release_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.release(key, token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_store_counts_calls() {
        let store = MockLockStore::new();
        store.acquire("k", "a", Duration::from_secs(1)).await.unwrap();
        store.refresh("k", "a", Duration::from_secs(1)).await.unwrap();
        store.release("k", "a").await.unwrap();

        assert_eq!(store.acquire_calls(), 1);
        assert_eq!(store.refresh_calls(), 1);
        assert_eq!(store.release_calls(), 1);
    }

    #[tokio::test]
    async fn test_mock_store_injects_failures_once() {
        let store = MockLockStore::new();
        store.fail_acquires(1);

        assert!(store.acquire("k", "a", Duration::from_secs(1)).await.is_err());
        assert!(store.acquire("k", "a", Duration::from_secs(1)).await.is_ok());
    }
}
