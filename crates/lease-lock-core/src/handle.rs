//! Handle for a held lock.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, instrument};

use crate::context::LockContext;
use crate::error::{LockError, LockResult};
use crate::store::{LockStore, RefreshOutcome, ReleaseOutcome};
use crate::watchdog::{self, Watchdog};

/// Everything needed to talk to the store on behalf of one acquisition.
pub(crate) struct Lease<S> {
    store: Arc<S>,
    key: String,
    token: String,
    ttl: Duration,
    /// Set once a release has reached the store, whatever it reported.
    released: AtomicBool,
}

impl<S: LockStore> Lease<S> {
    pub(crate) fn key(&self) -> &str {
        &self.key
    }

    pub(crate) fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    pub(crate) fn not_held(&self) -> LockError {
        LockError::LockNotHeld {
            key: self.key.clone(),
        }
    }

    pub(crate) async fn refresh(&self) -> LockResult<()> {
        match self.store.refresh(&self.key, &self.token, self.ttl).await? {
            RefreshOutcome::Extended => Ok(()),
            RefreshOutcome::NotOwner => Err(self.not_held()),
        }
    }

    async fn release(&self) -> LockResult<()> {
        let outcome = self.store.release(&self.key, &self.token).await?;
        self.released.store(true, Ordering::Release);
        match outcome {
            ReleaseOutcome::Deleted => Ok(()),
            ReleaseOutcome::NotOwner => Err(self.not_held()),
        }
    }
}

/// A successfully acquired lock.
///
/// The handle owns the stop signal for any renewal watchdog started from it.
/// Releasing or dropping the handle fires that signal; a dropped handle does
/// not delete the record, which then expires by TTL.
///
/// # Example
///
/// ```rust,ignore
/// let handle = client.try_acquire("orders", &token, Duration::from_secs(10)).await?;
/// let watchdog = handle.start_auto_renew(Duration::from_secs(3), Duration::from_millis(500));
/// do_work().await;
/// handle.release(&LockContext::background()).await?;
/// ```
pub struct LockHandle<S: LockStore> {
    lease: Arc<Lease<S>>,
    stop: watch::Sender<bool>,
}

impl<S: LockStore> LockHandle<S> {
    pub(crate) fn new(store: Arc<S>, key: &str, token: &str, ttl: Duration) -> Self {
        let (stop, _) = watch::channel(false);
        Self {
            lease: Arc::new(Lease {
                store,
                key: key.to_string(),
                token: token.to_string(),
                ttl,
                released: AtomicBool::new(false),
            }),
            stop,
        }
    }

    /// The lock key.
    pub fn key(&self) -> &str {
        &self.lease.key
    }

    /// The ownership token written to the store.
    pub fn token(&self) -> &str {
        &self.lease.token
    }

    /// TTL applied on acquire and on every refresh.
    pub fn lease(&self) -> Duration {
        self.lease.ttl
    }

    /// Signals every watchdog started from this handle to stop.
    ///
    /// Does not touch the store.
    pub fn stop_renewal(&self) {
        self.stop.send_replace(true);
    }

    /// Returns `true` once the stop signal has fired.
    pub fn is_renewal_stopped(&self) -> bool {
        *self.stop.borrow()
    }

    /// Deletes the lock record if this handle still owns it.
    ///
    /// Renewal is stopped before the store is contacted. Returns
    /// [`LockError::LockNotHeld`] if the lock had already expired or been
    /// taken over, so a second release also reports `LockNotHeld`.
    #[instrument(skip(self, ctx), fields(lock.key = %self.key()))]
    pub async fn release(&self, ctx: &LockContext) -> LockResult<()> {
        self.stop_renewal();
        ctx.run(self.lease.release()).await?;
        debug!("lock released");
        Ok(())
    }

    /// Extends the lock's TTL by one lease if this handle still owns it.
    #[instrument(skip(self, ctx), fields(lock.key = %self.key()))]
    pub async fn refresh(&self, ctx: &LockContext) -> LockResult<()> {
        ctx.run(self.lease.refresh()).await
    }

    /// Renews the lease every `interval` until stopped or renewal fails.
    ///
    /// Each refresh is bounded by `timeout`; a timed-out refresh is retried
    /// immediately instead of waiting for the next tick. Returns `Ok(())` when
    /// the stop signal fires and the refresh error otherwise.
    ///
    /// On a released handle this returns [`LockError::LockNotHeld`] without
    /// contacting the store. A zero `interval` or `timeout` is a
    /// [`LockError::Configuration`] error.
    pub async fn auto_renew(&self, interval: Duration, timeout: Duration) -> LockResult<()> {
        watchdog::renew(&self.lease, self.stop.subscribe(), interval, timeout).await
    }

    /// Spawns [`auto_renew`](Self::auto_renew) as a background task.
    ///
    /// Errors that `auto_renew` would return leave the watchdog
    /// [`Failed`](crate::WatchdogState::Failed).
    pub fn start_auto_renew(&self, interval: Duration, timeout: Duration) -> Watchdog {
        Watchdog::spawn(self.lease.clone(), self.stop.subscribe(), interval, timeout)
    }
}

impl<S: LockStore> fmt::Debug for LockHandle<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockHandle")
            .field("key", &self.lease.key)
            .field("lease", &self.lease.ttl)
            .finish_non_exhaustive()
    }
}

impl<S: LockStore> Drop for LockHandle<S> {
    fn drop(&mut self) {
        // Can't release asynchronously here; the record expires on its own.
        self.stop_renewal();
    }
}
