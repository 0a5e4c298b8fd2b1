//! Redis backend for lease locks.
//!
//! ```rust,no_run
//! use lease_lock_core::prelude::*;
//! use lease_lock_redis::RedisLockStore;
//! use std::time::Duration;
//!
//! # async fn run() -> LockResult<()> {
//! let store = RedisLockStore::new("redis://localhost:6379").await?;
//! let client = LockClient::new(store);
//! let handle = client.try_acquire("reports", "worker-1", Duration::from_secs(10)).await?;
//! handle.release(&LockContext::background()).await?;
//! # Ok(())
//! # }
//! ```

mod scripts;
pub mod store;

pub use store::{RedisLockStore, RedisLockStoreBuilder};
