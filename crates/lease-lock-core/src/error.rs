//! Error types for lease lock operations.

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during lock operations.
///
/// Contention and lost ownership are reported as distinct variants so callers
/// can tell "someone else has it" apart from "the store is unreachable".
#[derive(Error, Debug)]
pub enum LockError {
    /// A single non-blocking attempt found the key already held.
    #[error("failed to acquire lock '{key}': held by another owner")]
    FailedToAcquire { key: String },

    /// A blocking acquire ran out of retries.
    ///
    /// `last_error` is `None` when the final attempt lost to contention.
    #[error(
        "retries exhausted acquiring lock '{key}' after {attempts} attempts: {}",
        last_cause(.last_error)
    )]
    RetriesExhausted {
        key: String,
        attempts: u32,
        #[source]
        last_error: Option<Box<LockError>>,
    },

    /// A store round-trip or caller deadline ran out of time.
    #[error("deadline exceeded after {0:?}")]
    DeadlineExceeded(Duration),

    /// The caller cancelled the operation.
    #[error("lock operation was cancelled")]
    Cancelled,

    /// Release or refresh found that the caller no longer owns the lock.
    #[error("lock '{key}' is not held by this owner")]
    LockNotHeld { key: String },

    /// Transport or protocol failure talking to the store.
    #[error("store error: {0}")]
    Store(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Invalid client or store configuration.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl LockError {
    /// Wraps any backend error as [`LockError::Store`].
    pub fn store(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Store(err.into())
    }

    /// Returns `true` if the lock may no longer be held by the caller.
    pub fn is_lock_not_held(&self) -> bool {
        matches!(self, Self::LockNotHeld { .. })
    }

    /// Returns `true` for deadline expiry, whether per-call or caller-wide.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::DeadlineExceeded(_))
    }
}

fn last_cause(last_error: &Option<Box<LockError>>) -> String {
    match last_error {
        Some(e) => format!("last error: {e}"),
        None => "lock is held by another owner".to_string(),
    }
}

/// Result type for lock operations.
pub type LockResult<T> = Result<T, LockError>;
