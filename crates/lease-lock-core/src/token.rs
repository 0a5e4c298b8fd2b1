//! Ownership token generation.

use std::process;
use std::sync::atomic::{AtomicU64, Ordering};

use rand::Rng;

/// Generates a token unique to this process and call.
///
/// Format: `{process_id}_{counter}_{random_hex}`.
pub fn generate_token() -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let counter = COUNTER.fetch_add(1, Ordering::Relaxed);

    let random: u64 = rand::thread_rng().r#gen();

    format!("{}_{}_{:016x}", process::id(), counter, random)
}
