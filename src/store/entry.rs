//! Store Entry Module
//!
//! Defines the structure for individual store entries with TTL support.

use std::time::{SystemTime, UNIX_EPOCH};

// == Store Entry ==
/// Represents a single store entry with value and expiry metadata.
#[derive(Debug, Clone)]
pub struct StoreEntry {
    /// The stored value
    pub value: String,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    pub expires_at: Option<u64>,
}

impl StoreEntry {
    // == Constructor ==
    /// Creates a new store entry with optional TTL in milliseconds.
    pub fn new(value: String, ttl_ms: Option<u64>) -> Self {
        let now = current_timestamp_ms();
        let expires_at = ttl_ms.map(|ttl| now + ttl);

        Self {
            value,
            created_at: now,
            expires_at,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// Boundary condition: an entry is considered expired when the current
    /// time is greater than or equal to the expiration time, so an entry
    /// whose TTL has fully elapsed is immediately unobservable.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires) => current_timestamp_ms() >= expires,
            None => false,
        }
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_millis() as u64
}
