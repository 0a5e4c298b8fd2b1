//! Lua scripts executed atomically by Redis and their reply codes.

use lease_lock_core::error::{LockError, LockResult};
use lease_lock_core::store::{AcquireOutcome, RefreshOutcome, ReleaseOutcome};

/// Creates the key, or resets its TTL when the caller already owns it.
///
/// KEYS[1] = lock key, ARGV[1] = token, ARGV[2] = TTL in milliseconds.
/// Replies 1 (created), 2 (held by same token) or 0 (held by another).
pub(crate) const ACQUIRE_SCRIPT: &str = r#"
    local current = redis.call('get', KEYS[1])
    if current == false then
        redis.call('set', KEYS[1], ARGV[1], 'px', ARGV[2])
        return 1
    end
    if current == ARGV[1] then
        redis.call('pexpire', KEYS[1], ARGV[2])
        return 2
    end
    return 0
"#;

/// Resets the TTL when the caller owns the key. Replies 1 or 0.
pub(crate) const REFRESH_SCRIPT: &str = r#"
    if redis.call('get', KEYS[1]) == ARGV[1] then
        return redis.call('pexpire', KEYS[1], ARGV[2])
    end
    return 0
"#;

/// Deletes the key when the caller owns it. Replies the number of keys deleted.
pub(crate) const RELEASE_SCRIPT: &str = r#"
    if redis.call('get', KEYS[1]) == ARGV[1] then
        return redis.call('del', KEYS[1])
    end
    return 0
"#;

const ACQUIRE_CREATED: i64 = 1;
const ACQUIRE_REENTERED: i64 = 2;
const ACQUIRE_CONTENDED: i64 = 0;
const REFRESH_EXTENDED: i64 = 1;
const REFRESH_NOT_OWNER: i64 = 0;
const RELEASE_DELETED: i64 = 1;
const RELEASE_NOT_OWNER: i64 = 0;

fn unexpected_reply(script: &str, reply: i64) -> LockError {
    LockError::store(std::io::Error::other(format!(
        "unexpected reply {reply} from {script} script"
    )))
}

pub(crate) fn acquire_outcome(reply: i64) -> LockResult<AcquireOutcome> {
    match reply {
        ACQUIRE_CREATED => Ok(AcquireOutcome::Created),
        ACQUIRE_REENTERED => Ok(AcquireOutcome::HeldBySame),
        ACQUIRE_CONTENDED => Ok(AcquireOutcome::HeldByOther),
        other => Err(unexpected_reply("acquire", other)),
    }
}

pub(crate) fn refresh_outcome(reply: i64) -> LockResult<RefreshOutcome> {
    match reply {
        REFRESH_EXTENDED => Ok(RefreshOutcome::Extended),
        REFRESH_NOT_OWNER => Ok(RefreshOutcome::NotOwner),
        other => Err(unexpected_reply("refresh", other)),
    }
}

pub(crate) fn release_outcome(reply: i64) -> LockResult<ReleaseOutcome> {
    match reply {
        RELEASE_DELETED => Ok(ReleaseOutcome::Deleted),
        RELEASE_NOT_OWNER => Ok(ReleaseOutcome::NotOwner),
        other => Err(unexpected_reply("release", other)),
    }
}
