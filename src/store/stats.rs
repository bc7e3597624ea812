//! Store Statistics Module
//!
//! Tracks store performance metrics including hits, misses, and
//! lazily-expired entries.

use serde::Serialize;

// == Store Stats ==
/// Tracks store access metrics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StoreStats {
    /// Number of successful retrievals
    pub hits: u64,
    /// Number of failed retrievals (key absent or expired)
    pub misses: u64,
    /// Number of entries dropped because their TTL had elapsed
    pub expired: u64,
    /// Current number of entries in the store
    pub total_entries: usize,
}

impl StoreStats {
    /// Creates a new StoreStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Calculates the hit rate: hits / (hits + misses), or 0.0 if no
    /// requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Increments the hit counter.
    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    /// Increments the miss counter.
    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    /// Increments the expired-entry counter.
    pub fn record_expired(&mut self) {
        self.expired += 1;
    }

    /// Updates the total entries count.
    pub fn set_total_entries(&mut self, count: usize) {
        self.total_entries = count;
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let stats = StoreStats::new();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.expired, 0);
        assert_eq!(stats.total_entries, 0);
    }

    #[test]
    fn test_hit_rate_no_requests() {
        let stats = StoreStats::new();
        assert_eq!(stats.hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let mut stats = StoreStats::new();
        stats.record_hit();
        stats.record_miss();
        assert_eq!(stats.hit_rate(), 0.5);
    }

    #[test]
    fn test_record_expired() {
        let mut stats = StoreStats::new();
        stats.record_expired();
        stats.record_expired();
        assert_eq!(stats.expired, 2);
    }
}
