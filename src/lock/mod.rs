//! Distributed Lock Module
//!
//! Mutual exclusion across processes using the shared store as the single
//! synchronization point. A lock is a store entry `lock:<name> -> token`
//! written with set-if-absent and a TTL so a crashed holder cannot wedge
//! the resource forever.
//!
//! Release is ownership-verified: the stored token must equal the
//! presented one, so a slow holder whose lock already expired cannot
//! delete a newer holder's lock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use tracing::debug;
use uuid::Uuid;

use crate::error::{GateError, Result};
use crate::store::{KeyValueStore, LOCK_PREFIX};

// == Token Construction ==
/// Process-unique prefix for lock tokens. Combined with a per-process
/// sequence number, tokens are distinguishable across processes and across
/// acquisitions within one process.
static TOKEN_PREFIX: Lazy<String> = Lazy::new(|| Uuid::new_v4().simple().to_string());

static TOKEN_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Sleep between attempts in the blocking acquire path.
const ACQUIRE_BACKOFF: Duration = Duration::from_millis(50);

fn next_token_value() -> String {
    let seq = TOKEN_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("{}-{}", &*TOKEN_PREFIX, seq)
}

// == Lock Token ==
/// Proof of ownership over a named lock. Required to release it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockToken {
    name: String,
    value: String,
}

impl LockToken {
    /// Reconstructs a token from its parts, e.g. one handed to another
    /// component or persisted across an await point.
    pub fn from_parts(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// The lock name this token claims.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The opaque holder value stored under the lock key.
    pub fn value(&self) -> &str {
        &self.value
    }

    fn key(&self) -> String {
        format!("{LOCK_PREFIX}{}", self.name)
    }
}

// == Store Lock ==
/// Distributed lock over the shared store.
#[derive(Clone)]
pub struct StoreLock {
    store: Arc<dyn KeyValueStore>,
}

impl StoreLock {
    /// Creates a lock primitive over the given store.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    // == Try Acquire ==
    /// Non-blocking acquisition attempt. Returns the ownership token on
    /// success, `None` when another holder owns the lock.
    pub async fn try_acquire(&self, name: &str, ttl: Duration) -> Result<Option<LockToken>> {
        let token = LockToken {
            name: name.to_string(),
            value: next_token_value(),
        };

        let acquired = self
            .store
            .set_if_absent(&token.key(), token.value.clone(), ttl)
            .await?;

        if acquired {
            debug!(lock = name, token = %token.value, "lock acquired");
            Ok(Some(token))
        } else {
            Ok(None)
        }
    }

    // == Acquire (blocking) ==
    /// Retries `try_acquire` with fixed backoff until success or until
    /// `max_wait` elapses, then reports a timeout failure.
    pub async fn acquire(&self, name: &str, ttl: Duration, max_wait: Duration) -> Result<LockToken> {
        let deadline = tokio::time::Instant::now() + max_wait;

        loop {
            if let Some(token) = self.try_acquire(name, ttl).await? {
                return Ok(token);
            }
            if tokio::time::Instant::now() + ACQUIRE_BACKOFF > deadline {
                return Err(GateError::LockTimeout(name.to_string()));
            }
            tokio::time::sleep(ACQUIRE_BACKOFF).await;
        }
    }

    // == Release ==
    /// Deletes the lock only if the stored token matches the presented
    /// one. A mismatch (our lock expired and someone else holds it now) is
    /// a silent no-op.
    pub async fn release(&self, token: &LockToken) -> Result<()> {
        let key = token.key();
        match self.store.get(&key).await? {
            Some(current) if current == token.value => {
                self.store.delete(&key).await?;
                debug!(lock = %token.name, "lock released");
            }
            Some(_) => {
                debug!(lock = %token.name, "stale release ignored, lock held by another");
            }
            None => {
                debug!(lock = %token.name, "release of already-expired lock");
            }
        }
        Ok(())
    }
}

// == Lock Provider Capability ==
/// Handle returned by a [`LockProvider`]; consumed on unlock.
#[derive(Debug)]
pub struct LockHandle {
    token: LockToken,
}

impl LockHandle {
    /// The lock name this handle claims.
    pub fn name(&self) -> &str {
        self.token.name()
    }
}

/// Abstract mutual-exclusion capability consumed by the admission flow.
///
/// The production deployment may supply a provider with reentrancy and
/// lease renewal; [`StoreLockProvider`] is the in-crate one.
#[async_trait]
pub trait LockProvider: Send + Sync {
    /// Non-blocking lock attempt; `None` when the lock is held elsewhere.
    async fn try_lock(&self, name: &str) -> Result<Option<LockHandle>>;

    /// Releases a previously acquired lock.
    async fn unlock(&self, handle: LockHandle) -> Result<()>;
}

/// [`LockProvider`] backed by [`StoreLock`] with a fixed lease TTL.
pub struct StoreLockProvider {
    lock: StoreLock,
    ttl: Duration,
}

impl StoreLockProvider {
    /// Creates a provider issuing locks with the given lease TTL.
    pub fn new(store: Arc<dyn KeyValueStore>, ttl: Duration) -> Self {
        Self {
            lock: StoreLock::new(store),
            ttl,
        }
    }
}

#[async_trait]
impl LockProvider for StoreLockProvider {
    async fn try_lock(&self, name: &str) -> Result<Option<LockHandle>> {
        let token = self.lock.try_acquire(name, self.ttl).await?;
        Ok(token.map(|token| LockHandle { token }))
    }

    async fn unlock(&self, handle: LockHandle) -> Result<()> {
        self.lock.release(&handle.token).await
    }
}
