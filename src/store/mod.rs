//! Store Module
//!
//! Defines the narrow operation contract over the shared key-value store
//! and provides an in-process reference implementation.
//!
//! All core components (cache coordination, distributed locking, id
//! generation) consume only this contract; the production deployment
//! supplies a networked implementation, tests use [`MemoryStore`].

mod entry;
mod memory;
mod stats;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

// Re-export public types
pub use entry::StoreEntry;
pub use memory::MemoryStore;
pub use stats::StoreStats;

// == Key Naming Conventions ==
// These prefixes are an interoperability contract with collaborator
// features reading the same store; do not change them.

/// Prefix for all lock records
pub const LOCK_PREFIX: &str = "lock:";

/// Prefix for per-buyer admission locks (full key: `lock:order:<buyer-id>`)
pub const ORDER_LOCK_PREFIX: &str = "order:";

/// Prefix for time-bucketed sequence counters
pub const SEQUENCE_PREFIX: &str = "icr:";

/// The value written for a "confirmed absent" entry. A `get` returning
/// this (rather than nothing) means the source of truth was consulted and
/// had no row; callers must not fall through to the source again.
pub const EMPTY_SENTINEL: &str = "";

// == Key Value Store Contract ==
/// Operation contract for the shared key-value store.
///
/// Values are JSON strings. A key observably has one of three states:
/// absent (`None`), empty sentinel (`Some("")`), or a live value.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Retrieves the value at `key`, or `None` if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` at `key`, overwriting any previous value.
    /// `ttl: None` means the entry never expires at the store level.
    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<()>;

    /// Stores `value` at `key` only if the key is currently absent.
    /// Returns true if the write happened.
    async fn set_if_absent(&self, key: &str, value: String, ttl: Duration) -> Result<bool>;

    /// Removes `key`. Removing an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Atomically increments the integer at `key`, creating it at 0 first
    /// if absent, and returns the post-increment value.
    async fn increment(&self, key: &str) -> Result<i64>;
}
