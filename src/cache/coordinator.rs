//! Cache Coordinator Module
//!
//! Implements the three cache-aside strategies over an arbitrary
//! fetch-from-source function:
//!
//! - pass-through with null-caching (penetration guard)
//! - mutex-guarded rebuild (breakdown guard)
//! - logical expiration with asynchronous rebuild (non-blocking reads)

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::cache::payload::{self, CachedValue};
use crate::config::Config;
use crate::error::{GateError, Result};
use crate::lock::StoreLock;
use crate::store::{KeyValueStore, EMPTY_SENTINEL};

// == Cache Coordinator ==
/// Entry point for all cached reads.
///
/// Holds the rebuild lock primitive and a bounded pool of asynchronous
/// rebuild slots shared by every logically-expiring key.
#[derive(Clone)]
pub struct CacheCoordinator {
    store: Arc<dyn KeyValueStore>,
    lock: StoreLock,
    rebuild_pool: Arc<Semaphore>,
    config: Config,
}

impl CacheCoordinator {
    // == Constructor ==
    /// Creates a coordinator over the given store with the given tunables.
    pub fn new(store: Arc<dyn KeyValueStore>, config: Config) -> Self {
        Self {
            lock: StoreLock::new(store.clone()),
            rebuild_pool: Arc::new(Semaphore::new(config.rebuild_workers)),
            store,
            config,
        }
    }

    // == Pre-warm / Write Paths ==
    /// Stores a value under `<prefix><id>` with a store-level TTL.
    pub async fn put<T: Serialize>(
        &self,
        prefix: &str,
        id: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<()> {
        let key = cache_key(prefix, id);
        self.store.set(&key, payload::encode(value)?, Some(ttl)).await
    }

    /// Stores a value wrapped with a logical expiry of now + `ttl` and no
    /// store-level TTL. Keys served by `logical_fetch` must be seeded this
    /// way; that strategy never self-populates.
    pub async fn put_with_logical_expiry<T: Serialize>(
        &self,
        prefix: &str,
        id: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<()> {
        let key = cache_key(prefix, id);
        let wrapped = CachedValue::new(value, ttl);
        self.store.set(&key, payload::encode(&wrapped)?, None).await
    }

    /// Drops the cached entry for `<prefix><id>`. Called after a
    /// source-of-truth update so the next read rebuilds from fresh data.
    pub async fn invalidate(&self, prefix: &str, id: &str) -> Result<()> {
        self.store.delete(&cache_key(prefix, id)).await
    }

    // == Pass-Through Get ==
    /// Cache-aside read with null-caching.
    ///
    /// A hit returns the decoded value; a hit on the empty sentinel
    /// returns `Ok(None)` without touching the source ("confirmed
    /// absent"); a miss calls `fetch` exactly once, then caches either the
    /// value (with `ttl`) or a short-lived sentinel. A failing `fetch`
    /// propagates and writes nothing, so a transient source outage is
    /// never cached as "absent".
    pub async fn fetch_through<T, F, Fut>(
        &self,
        prefix: &str,
        id: &str,
        ttl: Duration,
        fetch: F,
    ) -> Result<Option<T>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<Option<T>>>,
    {
        let key = cache_key(prefix, id);

        match self.store.get(&key).await? {
            Some(raw) if raw == EMPTY_SENTINEL => return Ok(None),
            Some(raw) => return Ok(Some(payload::decode(&raw)?)),
            None => {}
        }

        self.rebuild_plain(&key, id, ttl, fetch).await
    }

    // == Mutex Get ==
    /// Cache-aside read where misses rebuild under a per-key lock.
    ///
    /// Under N concurrent misses for one key, exactly one caller executes
    /// `fetch`; the others sleep briefly and re-poll the cache. The retry
    /// loop is bounded: after `mutex_max_retries` failed polls the caller
    /// gets a `RebuildTimeout` instead of waiting forever.
    pub async fn mutex_fetch<T, F, Fut>(
        &self,
        prefix: &str,
        id: &str,
        ttl: Duration,
        fetch: F,
    ) -> Result<Option<T>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<Option<T>>>,
    {
        let key = cache_key(prefix, id);
        let lock_name = format!("{prefix}{id}");

        let mut attempts: u32 = 0;
        let token = loop {
            match self.store.get(&key).await? {
                Some(raw) if raw == EMPTY_SENTINEL => return Ok(None),
                Some(raw) => return Ok(Some(payload::decode(&raw)?)),
                None => {}
            }

            if let Some(token) = self
                .lock
                .try_acquire(&lock_name, self.config.rebuild_lock_ttl_duration())
                .await?
            {
                break token;
            }

            attempts += 1;
            if attempts > self.config.mutex_max_retries {
                return Err(GateError::RebuildTimeout(key));
            }
            tokio::time::sleep(self.config.mutex_retry_interval()).await;
        };

        // Winner path: another caller may have rebuilt the entry between
        // our last poll and the lock grant, so check the cache once more
        // under the lock before hitting the source.
        let result = self.rebuild_plain_checked(&key, id, ttl, fetch).await;

        if let Err(err) = self.lock.release(&token).await {
            warn!(key = %key, error = %err, "failed to release rebuild lock");
        }
        result
    }

    async fn rebuild_plain_checked<T, F, Fut>(
        &self,
        key: &str,
        id: &str,
        ttl: Duration,
        fetch: F,
    ) -> Result<Option<T>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<Option<T>>>,
    {
        match self.store.get(key).await? {
            Some(raw) if raw == EMPTY_SENTINEL => return Ok(None),
            Some(raw) => return Ok(Some(payload::decode(&raw)?)),
            None => {}
        }
        self.rebuild_plain(key, id, ttl, fetch).await
    }

    /// Fetches from source and writes either the value or a sentinel.
    async fn rebuild_plain<T, F, Fut>(
        &self,
        key: &str,
        id: &str,
        ttl: Duration,
        fetch: F,
    ) -> Result<Option<T>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<Option<T>>>,
    {
        match fetch(id.to_string()).await? {
            Some(value) => {
                self.store
                    .set(key, payload::encode(&value)?, Some(ttl))
                    .await?;
                Ok(Some(value))
            }
            None => {
                debug!(key = %key, "source confirmed absent, writing sentinel");
                self.store
                    .set(
                        key,
                        EMPTY_SENTINEL.to_string(),
                        Some(self.config.sentinel_ttl_duration()),
                    )
                    .await?;
                Ok(None)
            }
        }
    }

    // == Logical-Expire Get ==
    /// Non-blocking read of a logically-expiring entry.
    ///
    /// A cold key returns `Ok(None)` (seed it with
    /// [`put_with_logical_expiry`](Self::put_with_logical_expiry)). A
    /// fresh entry returns immediately. A stale entry also returns
    /// immediately, and a background rebuild is scheduled only when both
    /// the per-key rebuild lock and a pool slot are free; otherwise the
    /// rebuild request is dropped, never queued. Rebuild failures are
    /// logged and contained; the caller already has its (stale) answer.
    pub async fn logical_fetch<T, F, Fut>(
        &self,
        prefix: &str,
        id: &str,
        ttl: Duration,
        fetch: F,
    ) -> Result<Option<T>>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        F: FnOnce(String) -> Fut + Send + 'static,
        Fut: Future<Output = Result<Option<T>>> + Send,
    {
        let key = cache_key(prefix, id);

        let raw = match self.store.get(&key).await? {
            Some(raw) => raw,
            None => return Ok(None),
        };

        let wrapped: CachedValue<T> = payload::decode(&raw)?;
        if !wrapped.is_expired() {
            return Ok(Some(wrapped.data));
        }

        // Stale. Try to become the rebuilder; losers return the stale
        // value with nothing scheduled.
        let lock_name = format!("{prefix}{id}");
        if let Some(token) = self
            .lock
            .try_acquire(&lock_name, self.config.rebuild_lock_ttl_duration())
            .await?
        {
            match self.rebuild_pool.clone().try_acquire_owned() {
                Ok(permit) => {
                    let store = self.store.clone();
                    let lock = self.lock.clone();
                    let id = id.to_string();
                    let key = key.clone();

                    tokio::spawn(async move {
                        let _permit = permit;
                        if let Err(err) = rebuild_logical(&*store, &key, id, ttl, fetch).await {
                            warn!(key = %key, error = %err, "async cache rebuild failed");
                        }
                        if let Err(err) = lock.release(&token).await {
                            warn!(key = %key, error = %err, "failed to release rebuild lock");
                        }
                    });
                }
                Err(_) => {
                    debug!(key = %key, "rebuild pool saturated, dropping rebuild");
                    self.lock.release(&token).await?;
                }
            }
        }

        Ok(Some(wrapped.data))
    }
}

/// Re-fetches a logically-expired entry and rewrites it with a fresh
/// expiry. Runs on the rebuild pool; the caller holds the rebuild lock.
async fn rebuild_logical<T, F, Fut>(
    store: &dyn KeyValueStore,
    key: &str,
    id: String,
    ttl: Duration,
    fetch: F,
) -> Result<()>
where
    T: Serialize,
    F: FnOnce(String) -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    // The previous rebuilder may have finished between this reader's poll
    // and its lock grant; skip the source when the entry is fresh again.
    if let Some(raw) = store.get(key).await? {
        if let Ok(current) = payload::decode::<CachedValue<serde_json::Value>>(&raw) {
            if !current.is_expired() {
                return Ok(());
            }
        }
    }

    match fetch(id).await? {
        Some(value) => {
            let wrapped = CachedValue::new(value, ttl);
            store.set(key, payload::encode(&wrapped)?, None).await?;
            debug!(key = %key, "async cache rebuild complete");
        }
        None => {
            // The source row vanished; dropping the entry beats caching a
            // stale value forever.
            store.delete(key).await?;
            debug!(key = %key, "source row gone, cached entry dropped");
        }
    }
    Ok(())
}

fn cache_key(prefix: &str, id: &str) -> String {
    format!("{prefix}{id}")
}
