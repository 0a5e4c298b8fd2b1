//! Store capability used by the lock client.
//!
//! A backend implements [`LockStore`] once; the client, handle and watchdog
//! only ever talk to the store through these four operations.

use std::future::Future;
use std::time::Duration;

use crate::error::LockResult;

/// Result of an atomic acquire against the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// No record existed; one was created with the caller's token.
    Created,
    /// The record already carried the caller's token; its TTL was reset.
    HeldBySame,
    /// Another token owns the record. Nothing was written.
    HeldByOther,
}

impl AcquireOutcome {
    /// Returns `true` if the caller now holds the lock.
    pub fn is_acquired(self) -> bool {
        matches!(self, Self::Created | Self::HeldBySame)
    }
}

/// Result of an atomic verify-and-extend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Extended,
    /// The record is absent or owned by another token. Nothing was written.
    NotOwner,
}

/// Result of an atomic verify-and-delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    Deleted,
    /// The record is absent or owned by another token. Nothing was written.
    NotOwner,
}

/// Atomic lock operations offered by a key-value store.
///
/// Every method must execute as a single indivisible step on the store side:
/// no other client may observe or act on a state between the read and the
/// write. Semantic outcomes (contention, lost ownership) are returned as
/// `Ok`; `Err` is reserved for transport and protocol failures.
pub trait LockStore: Send + Sync + 'static {
    /// Sets `key` to `token` with a millisecond TTL only if `key` is absent.
    ///
    /// Returns `true` if the record was created.
    fn set_if_absent(
        &self,
        key: &str,
        token: &str,
        ttl: Duration,
    ) -> impl Future<Output = LockResult<bool>> + Send;

    /// Creates the record, or resets its TTL if `token` already owns it.
    fn acquire(
        &self,
        key: &str,
        token: &str,
        ttl: Duration,
    ) -> impl Future<Output = LockResult<AcquireOutcome>> + Send;

    /// Extends the TTL if `token` owns the record.
    fn refresh(
        &self,
        key: &str,
        token: &str,
        ttl: Duration,
    ) -> impl Future<Output = LockResult<RefreshOutcome>> + Send;

    /// Deletes the record if `token` owns it.
    fn release(
        &self,
        key: &str,
        token: &str,
    ) -> impl Future<Output = LockResult<ReleaseOutcome>> + Send;
}
