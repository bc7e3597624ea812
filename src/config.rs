//! Configuration Module
//!
//! Handles loading and managing core tunables from environment variables.

use std::env;
use std::time::Duration;

/// Tunables for the cache, lock and admission layers.
///
/// All values can be configured via environment variables with sensible
/// defaults. Defaults match the production deployment: 120 s absent
/// sentinel, 10 s rebuild lock, 50 ms mutex retry sleep, 10 rebuild workers.
#[derive(Debug, Clone)]
pub struct Config {
    /// TTL in seconds for the "confirmed absent" sentinel entries
    pub sentinel_ttl: u64,
    /// TTL in seconds for cache rebuild locks
    pub rebuild_lock_ttl: u64,
    /// Sleep between mutex-rebuild lock attempts, in milliseconds
    pub mutex_retry_interval_ms: u64,
    /// Maximum number of lookup retries in the mutex rebuild path
    pub mutex_max_retries: u32,
    /// TTL in seconds for per-buyer admission locks
    pub admission_lock_ttl: u64,
    /// Maximum number of logical-expiration rebuild tasks in flight
    pub rebuild_workers: usize,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SENTINEL_TTL` - Absent-sentinel TTL in seconds (default: 120)
    /// - `REBUILD_LOCK_TTL` - Rebuild lock TTL in seconds (default: 10)
    /// - `MUTEX_RETRY_INTERVAL_MS` - Retry sleep in milliseconds (default: 50)
    /// - `MUTEX_MAX_RETRIES` - Retry budget for mutex lookups (default: 100)
    /// - `ADMISSION_LOCK_TTL` - Per-buyer lock TTL in seconds (default: 10)
    /// - `REBUILD_WORKERS` - Rebuild task pool size (default: 10)
    pub fn from_env() -> Self {
        Self {
            sentinel_ttl: env::var("SENTINEL_TTL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(120),
            rebuild_lock_ttl: env::var("REBUILD_LOCK_TTL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            mutex_retry_interval_ms: env::var("MUTEX_RETRY_INTERVAL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(50),
            mutex_max_retries: env::var("MUTEX_MAX_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(100),
            admission_lock_ttl: env::var("ADMISSION_LOCK_TTL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            rebuild_workers: env::var("REBUILD_WORKERS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
        }
    }

    /// Absent-sentinel TTL as a Duration.
    pub fn sentinel_ttl_duration(&self) -> Duration {
        Duration::from_secs(self.sentinel_ttl)
    }

    /// Rebuild lock TTL as a Duration.
    pub fn rebuild_lock_ttl_duration(&self) -> Duration {
        Duration::from_secs(self.rebuild_lock_ttl)
    }

    /// Mutex retry sleep as a Duration.
    pub fn mutex_retry_interval(&self) -> Duration {
        Duration::from_millis(self.mutex_retry_interval_ms)
    }

    /// Per-buyer admission lock TTL as a Duration.
    pub fn admission_lock_ttl_duration(&self) -> Duration {
        Duration::from_secs(self.admission_lock_ttl)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sentinel_ttl: 120,
            rebuild_lock_ttl: 10,
            mutex_retry_interval_ms: 50,
            mutex_max_retries: 100,
            admission_lock_ttl: 10,
            rebuild_workers: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.sentinel_ttl, 120);
        assert_eq!(config.rebuild_lock_ttl, 10);
        assert_eq!(config.mutex_retry_interval_ms, 50);
        assert_eq!(config.mutex_max_retries, 100);
        assert_eq!(config.admission_lock_ttl, 10);
        assert_eq!(config.rebuild_workers, 10);
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        env::remove_var("SENTINEL_TTL");
        env::remove_var("REBUILD_LOCK_TTL");
        env::remove_var("MUTEX_RETRY_INTERVAL_MS");
        env::remove_var("MUTEX_MAX_RETRIES");
        env::remove_var("ADMISSION_LOCK_TTL");
        env::remove_var("REBUILD_WORKERS");

        let config = Config::from_env();
        assert_eq!(config.sentinel_ttl, 120);
        assert_eq!(config.rebuild_lock_ttl, 10);
        assert_eq!(config.mutex_retry_interval_ms, 50);
        assert_eq!(config.mutex_max_retries, 100);
    }

    #[test]
    fn test_duration_helpers() {
        let config = Config::default();
        assert_eq!(config.sentinel_ttl_duration(), Duration::from_secs(120));
        assert_eq!(config.mutex_retry_interval(), Duration::from_millis(50));
    }
}
