//! TTL Sweep Task
//!
//! Background task that periodically removes expired memory-store
//! entries. Reads already drop expired entries lazily; the sweep reclaims
//! the ones nobody touches again, such as elapsed absent-sentinels and
//! lock records of crashed holders.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::store::MemoryStore;

/// Spawns a background task that periodically sweeps expired entries.
///
/// # Arguments
/// * `store` - shared memory store to sweep
/// * `sweep_interval_secs` - interval in seconds between sweeps
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort it
/// during shutdown.
pub fn spawn_sweeper_task(store: Arc<MemoryStore>, sweep_interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(sweep_interval_secs);

    tokio::spawn(async move {
        info!(
            "Starting TTL sweep task with interval of {} seconds",
            sweep_interval_secs
        );

        loop {
            tokio::time::sleep(interval).await;

            let removed = store.sweep_expired().await;

            if removed > 0 {
                info!("TTL sweep: removed {} expired entries", removed);
            } else {
                debug!("TTL sweep: no expired entries found");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::KeyValueStore;

    #[tokio::test]
    async fn test_sweeper_removes_expired_entries() {
        let store = Arc::new(MemoryStore::new());

        store
            .set(
                "expire_soon",
                "value".to_string(),
                Some(Duration::from_millis(200)),
            )
            .await
            .unwrap();

        let handle = spawn_sweeper_task(store.clone(), 1);

        // Wait for the entry to expire and a sweep to run
        tokio::time::sleep(Duration::from_millis(2500)).await;

        assert_eq!(store.len().await, 0, "Expired entry should have been swept");
        handle.abort();
    }

    #[tokio::test]
    async fn test_sweeper_preserves_valid_entries() {
        let store = Arc::new(MemoryStore::new());

        store
            .set(
                "long_lived",
                "value".to_string(),
                Some(Duration::from_secs(3600)),
            )
            .await
            .unwrap();

        let handle = spawn_sweeper_task(store.clone(), 1);
        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert_eq!(
            store.get("long_lived").await.unwrap().as_deref(),
            Some("value")
        );
        handle.abort();
    }

    #[tokio::test]
    async fn test_sweeper_can_be_aborted() {
        let store = Arc::new(MemoryStore::new());

        let handle = spawn_sweeper_task(store, 1);
        handle.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
