//! In-process lock store.
//!
//! Useful for tests and for coordinating tasks inside a single process with
//! the same API used against a remote store.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::Instant;
use tracing::instrument;

use crate::error::{LockError, LockResult};
use crate::store::{AcquireOutcome, LockStore, RefreshOutcome, ReleaseOutcome};

#[derive(Debug, Clone)]
struct Record {
    token: String,
    expires_at: Instant,
}

/// A [`LockStore`] backed by a mutex-guarded map.
///
/// Each operation holds the mutex for its full read-compare-write, so the
/// operations are atomic with respect to each other. Expired records are
/// treated as absent; every record creation also sweeps out all expired
/// records, so one-off keys do not accumulate.
#[derive(Debug, Default)]
pub struct MemoryLockStore {
    records: Mutex<HashMap<String, Record>>,
}

impl MemoryLockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token of the live record for `key`, if any.
    pub fn token(&self, key: &str) -> Option<String> {
        let mut records = self.records();
        live(&mut records, key).map(|r| r.token.clone())
    }

    /// Time left before the record for `key` expires.
    pub fn remaining_ttl(&self, key: &str) -> Option<Duration> {
        let mut records = self.records();
        live(&mut records, key).map(|r| r.expires_at.saturating_duration_since(Instant::now()))
    }

    /// Number of live records.
    pub fn len(&self) -> usize {
        let mut records = self.records();
        sweep(&mut records);
        records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn records(&self) -> MutexGuard<'_, HashMap<String, Record>> {
        // A poisoned map is still structurally valid; every write is a single insert or remove.
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Instant at which a record written now with `ttl` expires.
fn expiry(ttl: Duration) -> LockResult<Instant> {
    Instant::now()
        .checked_add(ttl)
        .ok_or_else(|| LockError::Configuration(format!("lock TTL {ttl:?} is too large")))
}

fn sweep(records: &mut HashMap<String, Record>) {
    let now = Instant::now();
    records.retain(|_, r| r.expires_at > now);
}

/// Returns the live record for `key`, dropping it first if it has expired.
fn live<'a>(records: &'a mut HashMap<String, Record>, key: &str) -> Option<&'a mut Record> {
    if records
        .get(key)
        .is_some_and(|r| r.expires_at <= Instant::now())
    {
        records.remove(key);
    }
    records.get_mut(key)
}

impl LockStore for MemoryLockStore {
    #[instrument(skip(self, token), fields(backend = "memory"))]
    async fn set_if_absent(&self, key: &str, token: &str, ttl: Duration) -> LockResult<bool> {
        let expires_at = expiry(ttl)?;
        let mut records = self.records();
        if live(&mut records, key).is_some() {
            return Ok(false);
        }
        sweep(&mut records);
        records.insert(
            key.to_string(),
            Record {
                token: token.to_string(),
                expires_at,
            },
        );
        Ok(true)
    }

    #[instrument(skip(self, token), fields(backend = "memory"))]
    async fn acquire(&self, key: &str, token: &str, ttl: Duration) -> LockResult<AcquireOutcome> {
        let expires_at = expiry(ttl)?;
        let mut records = self.records();
        match live(&mut records, key) {
            Some(record) if record.token == token => {
                record.expires_at = expires_at;
                Ok(AcquireOutcome::HeldBySame)
            }
            Some(_) => Ok(AcquireOutcome::HeldByOther),
            None => {
                sweep(&mut records);
                records.insert(
                    key.to_string(),
                    Record {
                        token: token.to_string(),
                        expires_at,
                    },
                );
                Ok(AcquireOutcome::Created)
            }
        }
    }

    #[instrument(skip(self, token), fields(backend = "memory"))]
    async fn refresh(&self, key: &str, token: &str, ttl: Duration) -> LockResult<RefreshOutcome> {
        let expires_at = expiry(ttl)?;
        let mut records = self.records();
        match live(&mut records, key) {
            Some(record) if record.token == token => {
                record.expires_at = expires_at;
                Ok(RefreshOutcome::Extended)
            }
            _ => Ok(RefreshOutcome::NotOwner),
        }
    }

    #[instrument(skip(self, token), fields(backend = "memory"))]
    async fn release(&self, key: &str, token: &str) -> LockResult<ReleaseOutcome> {
        let mut records = self.records();
        if live(&mut records, key).is_some_and(|r| r.token == token) {
            records.remove(key);
            Ok(ReleaseOutcome::Deleted)
        } else {
            Ok(ReleaseOutcome::NotOwner)
        }
    }
}
