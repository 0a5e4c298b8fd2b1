//! Lock acquisition.

use std::sync::Arc;
use std::time::Duration;

use tracing::{Span, debug, instrument};

use crate::context::LockContext;
use crate::error::{LockError, LockResult};
use crate::handle::LockHandle;
use crate::retry::RetryStrategy;
use crate::store::{AcquireOutcome, LockStore};
use crate::token::generate_token;

/// Acquires locks against a shared store.
///
/// The client holds no per-lock state; it can be cloned freely and shared
/// across tasks.
///
/// # Example
///
/// ```rust,ignore
/// let client = LockClient::new(MemoryLockStore::new());
/// let handle = client
///     .acquire(
///         "reports",
///         "worker-1",
///         Duration::from_secs(10),
///         FixedIntervalRetry::new(Duration::from_millis(100), 10),
///         Duration::from_millis(500),
///         &LockContext::with_timeout(Duration::from_secs(5)),
///     )
///     .await?;
/// ```
pub struct LockClient<S> {
    store: Arc<S>,
}

impl<S> Clone for LockClient<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: LockStore> LockClient<S> {
    pub fn new(store: S) -> Self {
        Self::from_shared(Arc::new(store))
    }

    /// Creates a client over a store that is also used elsewhere.
    pub fn from_shared(store: Arc<S>) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Makes a single attempt to create the lock record.
    ///
    /// Uses a conditional set, so unlike [`acquire`](Self::acquire) this is
    /// not re-entrant: a key held by the same token is still reported as
    /// [`LockError::FailedToAcquire`].
    #[instrument(skip(self, token), fields(lock.key = %key, ttl = ?ttl))]
    pub async fn try_acquire(
        &self,
        key: &str,
        token: &str,
        ttl: Duration,
    ) -> LockResult<LockHandle<S>> {
        if self.store.set_if_absent(key, token, ttl).await? {
            debug!("lock acquired");
            Ok(LockHandle::new(self.store.clone(), key, token, ttl))
        } else {
            debug!("lock held by another owner");
            Err(LockError::FailedToAcquire {
                key: key.to_string(),
            })
        }
    }

    /// Acquires the lock, retrying on contention.
    ///
    /// Each store round-trip is bounded by `attempt_timeout`; hitting it ends
    /// the whole call with [`LockError::DeadlineExceeded`] since it points at
    /// an unavailable store rather than contention. Contention and other store
    /// errors consult `retry`; when it gives up the call fails with
    /// [`LockError::RetriesExhausted`]. `ctx` bounds both store calls and
    /// waits between attempts.
    #[instrument(
        skip(self, token, retry, ctx),
        fields(lock.key = %key, ttl = ?ttl, attempts = tracing::field::Empty)
    )]
    pub async fn acquire(
        &self,
        key: &str,
        token: &str,
        ttl: Duration,
        mut retry: impl RetryStrategy,
        attempt_timeout: Duration,
        ctx: &LockContext,
    ) -> LockResult<LockHandle<S>> {
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;
            Span::current().record("attempts", attempts);

            let attempt = tokio::select! {
                biased;
                reason = ctx.done() => return Err(reason),
                attempt = tokio::time::timeout(
                    attempt_timeout,
                    self.store.acquire(key, token, ttl),
                ) => attempt,
            };

            let last_error = match attempt {
                Err(_) => {
                    debug!("acquire attempt timed out");
                    return Err(LockError::DeadlineExceeded(attempt_timeout));
                }
                Ok(Ok(outcome)) if outcome.is_acquired() => {
                    debug!(?outcome, "lock acquired");
                    return Ok(LockHandle::new(self.store.clone(), key, token, ttl));
                }
                Ok(Ok(_)) => None,
                Ok(Err(e)) => Some(e),
            };

            let Some(wait) = retry.next() else {
                return Err(LockError::RetriesExhausted {
                    key: key.to_string(),
                    attempts,
                    last_error: last_error.map(Box::new),
                });
            };

            match &last_error {
                Some(e) => debug!(error = %e, ?wait, "acquire attempt failed, retrying"),
                None => debug!(?wait, "lock held by another owner, retrying"),
            }

            tokio::select! {
                biased;
                reason = ctx.done() => return Err(reason),
                _ = tokio::time::sleep(wait) => {}
            }
        }
    }

    /// [`try_acquire`](Self::try_acquire) with a freshly generated token.
    pub async fn try_acquire_auto(&self, key: &str, ttl: Duration) -> LockResult<LockHandle<S>> {
        self.try_acquire(key, &generate_token(), ttl).await
    }

    /// [`acquire`](Self::acquire) with a freshly generated token.
    pub async fn acquire_auto(
        &self,
        key: &str,
        ttl: Duration,
        retry: impl RetryStrategy,
        attempt_timeout: Duration,
        ctx: &LockContext,
    ) -> LockResult<LockHandle<S>> {
        self.acquire(key, &generate_token(), ttl, retry, attempt_timeout, ctx)
            .await
    }
}
