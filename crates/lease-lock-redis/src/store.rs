//! Redis implementation of [`LockStore`].

use std::time::Duration;

use fred::prelude::*;
use fred::types::CustomCommand;
use lease_lock_core::error::{LockError, LockResult};
use lease_lock_core::store::{AcquireOutcome, LockStore, RefreshOutcome, ReleaseOutcome};
use tracing::instrument;

use crate::scripts::{
    ACQUIRE_SCRIPT, REFRESH_SCRIPT, RELEASE_SCRIPT, acquire_outcome, refresh_outcome,
    release_outcome,
};

/// Builder for [`RedisLockStore`].
pub struct RedisLockStoreBuilder {
    url: Option<String>,
    client: Option<RedisClient>,
    key_prefix: String,
}

impl RedisLockStoreBuilder {
    /// Creates a builder with no server and no key prefix.
    pub fn new() -> Self {
        Self {
            url: None,
            client: None,
            key_prefix: String::new(),
        }
    }

    /// Sets the Redis server URL, e.g. `redis://localhost:6379`.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Uses an existing, already connected client. Takes precedence over `url`.
    pub fn client(mut self, client: RedisClient) -> Self {
        self.client = Some(client);
        self
    }

    /// Prepends `prefix` to every lock key written to Redis.
    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Connects (if needed) and builds the store.
    pub async fn build(self) -> LockResult<RedisLockStore> {
        let client = match (self.client, self.url) {
            (Some(client), _) => client,
            (None, Some(url)) => {
                let config = RedisConfig::from_url(&url).map_err(|e| {
                    LockError::Configuration(format!("invalid Redis URL '{url}': {e}"))
                })?;

                let client = RedisClient::new(config, None, None, None);
                client.connect();
                client.wait_for_connect().await.map_err(|e| {
                    LockError::store(std::io::Error::other(format!(
                        "failed to connect to Redis: {e}"
                    )))
                })?;
                client
            }
            (None, None) => {
                return Err(LockError::Configuration(
                    "no Redis client or URL provided".to_string(),
                ));
            }
        };

        Ok(RedisLockStore {
            client,
            key_prefix: self.key_prefix,
        })
    }
}

impl Default for RedisLockStoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Lock store backed by a single Redis server.
///
/// Acquire, refresh and release run as Lua scripts so each is one atomic
/// step on the server. TTLs are sent in milliseconds.
#[derive(Clone)]
pub struct RedisLockStore {
    client: RedisClient,
    key_prefix: String,
}

impl RedisLockStore {
    /// Returns a new builder for configuring the store.
    pub fn builder() -> RedisLockStoreBuilder {
        RedisLockStoreBuilder::new()
    }

    /// Connects to the server at `url`.
    pub async fn new(url: impl Into<String>) -> LockResult<Self> {
        Self::builder().url(url).build().await
    }

    /// The underlying client.
    pub fn client(&self) -> &RedisClient {
        &self.client
    }

    fn key(&self, key: &str) -> String {
        prefixed_key(&self.key_prefix, key)
    }

    async fn eval(&self, op: &str, script: &'static str, args: Vec<RedisValue>) -> LockResult<i64> {
        let mut command: Vec<RedisValue> = Vec::with_capacity(args.len() + 2);
        command.push(script.into());
        command.push(1_i64.into()); // numkeys
        command.extend(args);

        let cmd = CustomCommand::new_static("EVAL", None, false);
        self.client
            .custom(cmd, command)
            .await
            .map_err(|e| redis_error(op, e))
    }
}

fn prefixed_key(prefix: &str, key: &str) -> String {
    format!("{prefix}{key}")
}

fn ttl_millis(ttl: Duration) -> LockResult<i64> {
    match i64::try_from(ttl.as_millis()) {
        Ok(0) => Err(LockError::Configuration(
            "lock TTL must be at least one millisecond".to_string(),
        )),
        Ok(millis) => Ok(millis),
        Err(_) => Err(LockError::Configuration(format!("lock TTL {ttl:?} is too large"))),
    }
}

fn redis_error(op: &str, e: RedisError) -> LockError {
    LockError::store(std::io::Error::other(format!("Redis {op} failed: {e}")))
}

impl LockStore for RedisLockStore {
    #[instrument(skip(self, token), fields(backend = "redis"))]
    async fn set_if_absent(&self, key: &str, token: &str, ttl: Duration) -> LockResult<bool> {
        let ttl = ttl_millis(ttl)?;

        // SET NX returns OK if the key was set and nil if it already exists.
        let result: Option<String> = self
            .client
            .set(
                self.key(key),
                token,
                Some(Expiration::PX(ttl)),
                Some(SetOptions::NX),
                false,
            )
            .await
            .map_err(|e| redis_error("SET NX", e))?;

        Ok(result.is_some())
    }

    #[instrument(skip(self, token), fields(backend = "redis"))]
    async fn acquire(&self, key: &str, token: &str, ttl: Duration) -> LockResult<AcquireOutcome> {
        let ttl = ttl_millis(ttl)?;
        let reply = self
            .eval(
                "EVAL (acquire)",
                ACQUIRE_SCRIPT,
                vec![self.key(key).into(), token.into(), ttl.into()],
            )
            .await?;
        acquire_outcome(reply)
    }

    #[instrument(skip(self, token), fields(backend = "redis"))]
    async fn refresh(&self, key: &str, token: &str, ttl: Duration) -> LockResult<RefreshOutcome> {
        let ttl = ttl_millis(ttl)?;
        let reply = self
            .eval(
                "EVAL (refresh)",
                REFRESH_SCRIPT,
                vec![self.key(key).into(), token.into(), ttl.into()],
            )
            .await?;
        refresh_outcome(reply)
    }

    #[instrument(skip(self, token), fields(backend = "redis"))]
    async fn release(&self, key: &str, token: &str) -> LockResult<ReleaseOutcome> {
        let reply = self
            .eval(
                "EVAL (release)",
                RELEASE_SCRIPT,
                vec![self.key(key).into(), token.into()],
            )
            .await?;
        release_outcome(reply)
    }
}
