//! Example: Coordinating tasks with the in-memory store
//!
//! Run with: `cargo run --example memory_lock`

use lease_lock_core::MemoryLockStore;
use lease_lock_core::prelude::*;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "debug".into()))
        .init();

    let client = LockClient::new(MemoryLockStore::new());

    let workers: Vec<_> = (0..3)
        .map(|id| {
            let client = client.clone();
            tokio::spawn(async move {
                let handle = client
                    .acquire(
                        "shared-counter",
                        &format!("worker-{id}"),
                        Duration::from_millis(300),
                        ExponentialBackoffRetry::new(
                            Duration::from_millis(20),
                            Duration::from_millis(200),
                            20,
                        )
                        .with_jitter(),
                        Duration::from_millis(50),
                        &LockContext::with_timeout(Duration::from_secs(10)),
                    )
                    .await?;

                let watchdog =
                    handle.start_auto_renew(Duration::from_millis(100), Duration::from_millis(50));
                tracing::info!(worker = id, "in critical section");
                tokio::time::sleep(Duration::from_millis(500)).await;

                handle.release(&LockContext::background()).await?;
                watchdog.join().await?;
                tracing::info!(worker = id, "released");
                Ok::<_, LockError>(())
            })
        })
        .collect();

    for worker in workers {
        worker.await??;
    }
    Ok(())
}
