//! Lease-based distributed locks over a shared key-value store.
//!
//! A lock is a key in the store holding an ownership token with a TTL. At most
//! one owner holds a key at a time; only the owner can extend or delete it;
//! and a background watchdog can keep the lease alive through a long critical
//! section.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use lease_lock::*;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = RedisLockStore::new("redis://localhost:6379").await?;
//!     let client = LockClient::new(store);
//!
//!     let handle = client
//!         .acquire_auto(
//!             "my-resource",
//!             Duration::from_secs(10),
//!             FixedIntervalRetry::new(Duration::from_millis(100), 50),
//!             Duration::from_millis(500),
//!             &LockContext::with_timeout(Duration::from_secs(5)),
//!         )
//!         .await?;
//!
//!     // Keep the lease alive while working.
//!     let mut watchdog = handle.start_auto_renew(Duration::from_secs(3), Duration::from_millis(500));
//!     tokio::select! {
//!         _ = watchdog.exited() => eprintln!("lock lost, aborting"),
//!         _ = tokio::time::sleep(Duration::from_secs(20)) => println!("work done"),
//!     }
//!
//!     handle.release(&LockContext::background()).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Backends
//!
//! - [`MemoryLockStore`]: in-process, for tests and single-process use.
//! - `RedisLockStore` (feature `redis`, on by default): a single Redis server,
//!   using Lua scripts for atomic check-and-set.
//!
//! Other stores plug in by implementing [`LockStore`].

// Re-export core types and traits
pub use lease_lock_core::*;

// Re-export redis backend
#[cfg(feature = "redis")]
#[allow(ambiguous_glob_reexports)]
pub use lease_lock_redis::*;
