//! Memory Store Module
//!
//! In-process implementation of the store contract: HashMap storage with
//! TTL expiry, an atomic counter primitive, and access statistics.
//!
//! Used as the reference implementation in tests and single-node
//! deployments; production supplies a networked store behind the same
//! trait.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{GateError, Result};
use crate::store::{KeyValueStore, StoreEntry, StoreStats};

// == Memory Store ==
/// In-memory key-value store with TTL support and atomic increment.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    /// Key-value storage
    entries: HashMap<String, StoreEntry>,
    /// Access statistics
    stats: StoreStats,
}

impl MemoryStore {
    // == Constructor ==
    /// Creates a new, empty MemoryStore.
    pub fn new() -> Self {
        Self::default()
    }

    // == Stats ==
    /// Returns a snapshot of current store statistics.
    pub async fn stats(&self) -> StoreStats {
        let inner = self.inner.read().await;
        let mut stats = inner.stats.clone();
        stats.set_total_entries(inner.entries.len());
        stats
    }

    // == Sweep Expired ==
    /// Removes all expired entries. Returns the number removed.
    ///
    /// Expired entries are also dropped lazily on read; the periodic sweep
    /// reclaims entries nobody reads again.
    pub async fn sweep_expired(&self) -> usize {
        let mut inner = self.inner.write().await;

        let expired_keys: Vec<String> = inner
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();

        let count = expired_keys.len();
        for key in &expired_keys {
            inner.entries.remove(key);
            inner.stats.record_expired();
        }

        let len = inner.entries.len();
        inner.stats.set_total_entries(len);
        count
    }

    // == Length ==
    /// Returns the current number of entries (expired ones included until
    /// swept).
    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    /// Returns true if the store holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.entries.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        // Write lock: reads drop expired entries and update stats
        let mut inner = self.inner.write().await;

        match inner.entries.get(key) {
            Some(entry) if entry.is_expired() => {
                inner.entries.remove(key);
                inner.stats.record_expired();
                inner.stats.record_miss();
                Ok(None)
            }
            Some(entry) => {
                let value = entry.value.clone();
                inner.stats.record_hit();
                Ok(Some(value))
            }
            None => {
                inner.stats.record_miss();
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<()> {
        let mut inner = self.inner.write().await;
        let ttl_ms = ttl.map(|d| d.as_millis() as u64);
        inner
            .entries
            .insert(key.to_string(), StoreEntry::new(value, ttl_ms));
        Ok(())
    }

    async fn set_if_absent(&self, key: &str, value: String, ttl: Duration) -> Result<bool> {
        let mut inner = self.inner.write().await;

        // An expired entry counts as absent
        let occupied = match inner.entries.get(key) {
            Some(entry) => !entry.is_expired(),
            None => false,
        };
        if occupied {
            return Ok(false);
        }

        let ttl_ms = ttl.as_millis() as u64;
        inner
            .entries
            .insert(key.to_string(), StoreEntry::new(value, Some(ttl_ms)));
        Ok(true)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.entries.remove(key);
        Ok(())
    }

    async fn increment(&self, key: &str) -> Result<i64> {
        let mut inner = self.inner.write().await;

        let current = match inner.entries.get(key) {
            Some(entry) if !entry.is_expired() => entry
                .value
                .parse::<i64>()
                .map_err(|e| GateError::Store(format!("counter at {key} is not an integer: {e}")))?,
            _ => 0,
        };

        let next = current + 1;
        // Counters never carry a TTL; buckets roll over by key name instead
        inner
            .entries
            .insert(key.to_string(), StoreEntry::new(next.to_string(), None));
        Ok(next)
    }
}
