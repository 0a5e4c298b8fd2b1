//! Background lease renewal.

use std::future::ready;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, instrument, warn};

use crate::error::{LockError, LockResult};
use crate::handle::Lease;
use crate::store::LockStore;

/// Lifecycle of a renewal watchdog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogState {
    /// Renewing on every tick.
    Running,
    /// The handle's stop signal fired. No further refreshes will be sent.
    Stopped,
    /// Renewal ended with an error; the lock may no longer be held.
    Failed,
}

/// A spawned renewal task for one lock handle.
///
/// Dropping the watchdog does not stop renewal; fire the handle's stop signal
/// (or release the handle) for that.
#[derive(Debug)]
pub struct Watchdog {
    state: watch::Receiver<WatchdogState>,
    task: JoinHandle<LockResult<()>>,
}

impl Watchdog {
    pub(crate) fn spawn<S: LockStore>(
        lease: Arc<Lease<S>>,
        stop: watch::Receiver<bool>,
        interval: Duration,
        timeout: Duration,
    ) -> Self {
        let (state_sender, state) = watch::channel(WatchdogState::Running);

        let task = tokio::spawn(async move {
            let result = renew(&lease, stop, interval, timeout).await;
            let exit = match result {
                Ok(()) => WatchdogState::Stopped,
                Err(_) => WatchdogState::Failed,
            };
            state_sender.send_replace(exit);
            result
        });

        Self { state, task }
    }

    /// Current state.
    pub fn state(&self) -> WatchdogState {
        *self.state.borrow()
    }

    /// Waits until the watchdog leaves [`WatchdogState::Running`].
    ///
    /// Use this alongside the critical section to abort it when renewal fails.
    pub async fn exited(&mut self) -> WatchdogState {
        match self
            .state
            .wait_for(|state| *state != WatchdogState::Running)
            .await
        {
            Ok(state) => *state,
            // The task ended without publishing a state, i.e. it panicked.
            Err(_) => WatchdogState::Failed,
        }
    }

    /// Returns `true` once the task has finished.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the task and returns the renewal result.
    pub async fn join(self) -> LockResult<()> {
        self.task.await.map_err(LockError::store)?
    }
}

/// Resolves once the stop signal fires or its sender is dropped.
async fn stopped(stop: &mut watch::Receiver<bool>) {
    // A dropped sender means the handle is gone; stop as well.
    let _ = stop.wait_for(|stopped| *stopped).await;
}

/// Runs the renewal loop until `stop` fires or a refresh fails.
///
/// Each iteration waits on the first of: the stop signal, a pending immediate
/// retry after a timed-out refresh, or the next tick.
#[instrument(skip_all, fields(lock.key = %lease.key(), interval = ?interval, timeout = ?timeout))]
pub(crate) async fn renew<S: LockStore>(
    lease: &Lease<S>,
    mut stop: watch::Receiver<bool>,
    interval: Duration,
    timeout: Duration,
) -> LockResult<()> {
    if interval.is_zero() || timeout.is_zero() {
        return Err(LockError::Configuration(format!(
            "renewal interval ({interval:?}) and refresh timeout ({timeout:?}) must be non-zero"
        )));
    }
    if lease.is_released() {
        debug!("lease already released");
        return Err(lease.not_held());
    }

    let first_tick = Instant::now().checked_add(interval).ok_or_else(|| {
        LockError::Configuration(format!("renewal interval {interval:?} is too large"))
    })?;
    let mut ticker = tokio::time::interval_at(first_tick, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut retry_now = false;

    loop {
        tokio::select! {
            biased;
            _ = stopped(&mut stop) => {
                debug!("renewal stopped");
                return Ok(());
            }
            _ = ready(()), if retry_now => {}
            _ = ticker.tick() => {}
        }
        retry_now = false;

        let outcome = tokio::select! {
            biased;
            _ = stopped(&mut stop) => {
                debug!("renewal stopped during refresh");
                return Ok(());
            }
            outcome = tokio::time::timeout(timeout, lease.refresh()) => outcome,
        };

        match outcome {
            Ok(Ok(())) => debug!("lease extended"),
            Ok(Err(e)) => {
                warn!(error = %e, "lease renewal failed");
                return Err(e);
            }
            Err(_) => {
                warn!("lease refresh timed out, retrying immediately");
                retry_now = true;
            }
        }
    }
}
