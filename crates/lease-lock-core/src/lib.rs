//! Core types for lease-based distributed locks.
//!
//! A lock is a record in a shared key-value store mapping a key to an
//! ownership token with a TTL. [`LockClient`] creates the record,
//! [`LockHandle`] refreshes and deletes it, and [`Watchdog`] keeps the lease
//! alive in the background. Backends plug in by implementing [`LockStore`].

pub mod client;
pub mod context;
pub mod error;
pub mod handle;
pub mod memory;
pub mod prelude;
pub mod retry;
pub mod store;
pub mod token;
pub mod watchdog;

pub use client::LockClient;
pub use context::LockContext;
pub use error::{LockError, LockResult};
pub use handle::LockHandle;
pub use memory::MemoryLockStore;
pub use retry::{ExponentialBackoffRetry, FixedIntervalRetry, RetryStrategy};
pub use store::{AcquireOutcome, LockStore, RefreshOutcome, ReleaseOutcome};
pub use token::generate_token;
pub use watchdog::{Watchdog, WatchdogState};
