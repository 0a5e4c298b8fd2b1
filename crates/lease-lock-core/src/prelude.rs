//! Convenience prelude for lease lock types.

pub use crate::client::LockClient;
pub use crate::context::LockContext;
pub use crate::error::{LockError, LockResult};
pub use crate::handle::LockHandle;
pub use crate::retry::{ExponentialBackoffRetry, FixedIntervalRetry, RetryStrategy};
pub use crate::store::LockStore;
pub use crate::watchdog::{Watchdog, WatchdogState};
