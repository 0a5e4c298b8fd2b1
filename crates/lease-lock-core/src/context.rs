//! Caller-supplied deadline and cancellation for lock operations.

use std::future::{Future, pending};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

use crate::error::{LockError, LockResult};

/// Bounds how long a lock operation may run.
///
/// A context carries an optional deadline and an optional cancel signal.
/// Whichever fires first ends the operation; [`done`](Self::done) reports
/// which one as a [`LockError`].
#[derive(Debug, Clone, Default)]
pub struct LockContext {
    deadline: Option<(Instant, Duration)>,
    cancel: Option<watch::Receiver<bool>>,
}

impl LockContext {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    /// A context whose deadline is `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::background().and_timeout(timeout)
    }

    /// A context cancelled when `true` is sent on the paired sender.
    ///
    /// Dropping the sender without sending `true` does not cancel.
    pub fn with_cancel(cancel: watch::Receiver<bool>) -> Self {
        Self {
            deadline: None,
            cancel: Some(cancel),
        }
    }

    /// Adds a deadline `timeout` from now, keeping the earlier one if present.
    ///
    /// A timeout too large to represent as an instant adds no deadline.
    pub fn and_timeout(mut self, timeout: Duration) -> Self {
        let Some(at) = Instant::now().checked_add(timeout) else {
            return self;
        };
        match self.deadline {
            Some((existing, _)) if existing <= at => {}
            _ => self.deadline = Some((at, timeout)),
        }
        self
    }

    /// The instant after which the context is done, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline.map(|(at, _)| at)
    }

    /// Returns the cancellation reason if the context is already done.
    pub fn err(&self) -> Option<LockError> {
        if let Some(cancel) = &self.cancel
            && *cancel.borrow()
        {
            return Some(LockError::Cancelled);
        }
        match self.deadline {
            Some((at, timeout)) if Instant::now() >= at => {
                Some(LockError::DeadlineExceeded(timeout))
            }
            _ => None,
        }
    }

    /// Resolves once the context is cancelled or its deadline passes.
    pub async fn done(&self) -> LockError {
        let expired = async {
            match self.deadline {
                Some((at, timeout)) => {
                    tokio::time::sleep_until(at).await;
                    LockError::DeadlineExceeded(timeout)
                }
                None => pending().await,
            }
        };

        let cancelled = async {
            if let Some(cancel) = &self.cancel {
                let mut cancel = cancel.clone();
                let fired = cancel.wait_for(|cancelled| *cancelled).await.is_ok();
                if fired {
                    return LockError::Cancelled;
                }
            }
            pending().await
        };

        tokio::select! {
            biased;
            reason = cancelled => reason,
            reason = expired => reason,
        }
    }

    /// Runs `fut` unless the context finishes first.
    pub async fn run<T, F>(&self, fut: F) -> LockResult<T>
    where
        F: Future<Output = LockResult<T>>,
    {
        if let Some(reason) = self.err() {
            return Err(reason);
        }
        tokio::select! {
            biased;
            reason = self.done() => Err(reason),
            result = fut => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_deadline_reports_timeout() {
        let ctx = LockContext::with_timeout(Duration::from_millis(100));
        assert!(ctx.err().is_none());

        let reason = ctx.done().await;
        assert!(matches!(reason, LockError::DeadlineExceeded(d) if d == Duration::from_millis(100)));
        assert!(ctx.err().is_some());
    }

    #[tokio::test]
    async fn test_cancel_signal() {
        let (tx, rx) = watch::channel(false);
        let ctx = LockContext::with_cancel(rx);
        assert!(ctx.err().is_none());

        tx.send(true).unwrap();
        assert!(matches!(ctx.done().await, LockError::Cancelled));
        assert!(matches!(ctx.err(), Some(LockError::Cancelled)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_sender_does_not_cancel() {
        let (tx, rx) = watch::channel(false);
        drop(tx);
        let ctx = LockContext::with_cancel(rx).and_timeout(Duration::from_secs(1));

        assert!(matches!(ctx.done().await, LockError::DeadlineExceeded(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_and_timeout_keeps_earliest_deadline() {
        let ctx = LockContext::with_timeout(Duration::from_millis(10))
            .and_timeout(Duration::from_secs(10));
        assert!(matches!(
            ctx.done().await,
            LockError::DeadlineExceeded(d) if d == Duration::from_millis(10)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_aborts_slow_future() {
        let ctx = LockContext::with_timeout(Duration::from_millis(50));
        let result: LockResult<()> = ctx
            .run(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;
        assert!(result.unwrap_err().is_timeout());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unrepresentable_timeout_adds_no_deadline() {
        let ctx = LockContext::with_timeout(Duration::MAX);
        assert!(ctx.deadline().is_none());
        assert!(ctx.err().is_none());

        let ctx = LockContext::with_timeout(Duration::from_millis(10)).and_timeout(Duration::MAX);
        assert!(matches!(
            ctx.done().await,
            LockError::DeadlineExceeded(d) if d == Duration::from_millis(10)
        ));
    }
}
