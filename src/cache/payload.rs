//! Cache Payload Module
//!
//! The explicit serialization contract for cached artifacts: plain values
//! are stored as JSON, logically-expiring values as a JSON wrapper
//! carrying the payload and its freshness timestamp.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::Result;

// == Cached Value Wrapper ==
/// A payload with an embedded logical-expiry timestamp.
///
/// Entries stored through this wrapper carry no store-level TTL; freshness
/// is judged against `expires_at` and stale entries are replaced by the
/// asynchronous rebuild path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedValue<T> {
    /// The wrapped payload
    pub data: T,
    /// The instant after which the payload counts as stale
    pub expires_at: DateTime<Utc>,
}

impl<T> CachedValue<T> {
    /// Wraps `data` with a logical expiry of now + `ttl`.
    pub fn new(data: T, ttl: Duration) -> Self {
        Self {
            data,
            expires_at: Utc::now() + chrono::Duration::milliseconds(ttl.as_millis() as i64),
        }
    }

    /// True once the logical expiry has passed.
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

// == Codec ==
/// Encodes a value for storage.
pub fn encode<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

/// Decodes a stored value.
pub fn decode<T: DeserializeOwned>(raw: &str) -> Result<T> {
    Ok(serde_json::from_str(raw)?)
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Shop {
        id: u64,
        name: String,
    }

    fn sample() -> Shop {
        Shop {
            id: 7,
            name: "corner cafe".to_string(),
        }
    }

    #[test]
    fn test_plain_value_roundtrip() {
        let raw = encode(&sample()).unwrap();
        let back: Shop = decode(&raw).unwrap();
        assert_eq!(back, sample());
    }

    #[test]
    fn test_wrapper_fresh_and_expired() {
        let fresh = CachedValue::new(sample(), Duration::from_secs(60));
        assert!(!fresh.is_expired());

        let stale = CachedValue::new(sample(), Duration::ZERO);
        assert!(stale.is_expired());
    }

    #[test]
    fn test_wrapper_roundtrip_preserves_expiry() {
        let wrapped = CachedValue::new(sample(), Duration::from_secs(60));
        let raw = encode(&wrapped).unwrap();
        let back: CachedValue<Shop> = decode(&raw).unwrap();

        assert_eq!(back.data, sample());
        assert_eq!(back.expires_at, wrapped.expires_at);
    }

    #[test]
    fn test_decode_corrupt_entry_fails() {
        let result: Result<Shop> = decode("{not json");
        assert!(result.is_err());
    }
}
