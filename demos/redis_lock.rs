//! Example: Using Redis lease locks
//!
//! Run with: `cargo run --example redis_lock`
//!
//! Requires a Redis server. Set REDIS_URL environment variable
//! or modify the URL below.

use lease_lock::*;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Get Redis URL from environment or use default
    let redis_url = std::env::var("REDIS_URL")
        .unwrap_or_else(|_| "redis://localhost:6379".to_string());

    println!("Connecting to Redis...");
    let store = RedisLockStore::builder()
        .url(&redis_url)
        .key_prefix("lease-lock-demo:")
        .build()
        .await?;
    let client = LockClient::new(store);

    // Acquire the lock, retrying every 100ms for up to 5 seconds
    println!("Acquiring lock...");
    let handle = client
        .acquire_auto(
            "example-resource",
            Duration::from_secs(10),
            FixedIntervalRetry::new(Duration::from_millis(100), 50),
            Duration::from_millis(500),
            &LockContext::with_timeout(Duration::from_secs(5)),
        )
        .await?;
    println!("Lock acquired with token {}", handle.token());

    // Keep the 10 second lease alive while doing 15 seconds of work
    let mut watchdog = handle.start_auto_renew(Duration::from_secs(3), Duration::from_millis(500));
    println!("Doing long-running work...");
    tokio::select! {
        state = watchdog.exited() => {
            println!("Renewal ended ({state:?}); the lock may be lost, aborting work");
        }
        _ = tokio::time::sleep(Duration::from_secs(15)) => println!("Work completed"),
    }

    // Release stops the watchdog before deleting the key
    match handle.release(&LockContext::with_timeout(Duration::from_secs(1))).await {
        Ok(()) => println!("Lock released"),
        Err(e) if e.is_lock_not_held() => println!("Lock had already been lost"),
        Err(e) => return Err(e.into()),
    }
    watchdog.join().await.ok();

    // A second, non-blocking attempt from another owner
    let first = client.try_acquire("example-resource", "owner-a", Duration::from_secs(5)).await?;
    match client.try_acquire("example-resource", "owner-b", Duration::from_secs(5)).await {
        Err(LockError::FailedToAcquire { key }) => println!("'{key}' is held by owner-a"),
        other => println!("Unexpected result: {other:?}"),
    }
    first.release(&LockContext::background()).await?;

    Ok(())
}
