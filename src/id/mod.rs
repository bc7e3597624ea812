//! Id Generator Module
//!
//! Mints globally unique, time-ordered 64-bit identifiers without a
//! central sequencer. The high 32 bits are seconds elapsed since a fixed
//! reference epoch; the low 32 bits come from a per-day atomic counter in
//! the shared store, so ordering needs no clock agreement beyond coarse
//! wall-clock seconds.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::store::{KeyValueStore, SEQUENCE_PREFIX};

/// Reference epoch: 2023-01-01T00:00:00Z.
pub const ID_EPOCH_SECS: i64 = 1_672_531_200;

/// Bits reserved for the per-day sequence.
const SEQUENCE_BITS: u32 = 32;

const SEQUENCE_MASK: u64 = (1 << SEQUENCE_BITS) - 1;

// == Bit Layout ==
/// Composes an id from elapsed seconds and a sequence number.
///
/// Elapsed seconds dominate the high bits, so ids minted in later seconds
/// compare greater regardless of sequence. The sequence is truncated to
/// 32 bits; a day bucket therefore supports up to 2^32 allocations.
pub fn compose_id(elapsed_secs: u64, sequence: u64) -> u64 {
    (elapsed_secs << SEQUENCE_BITS) | (sequence & SEQUENCE_MASK)
}

fn bucket_key(prefix: &str, now: &DateTime<Utc>) -> String {
    format!("{SEQUENCE_PREFIX}{prefix}:{}", now.format("%Y:%m:%d"))
}

// == Id Generator ==
/// Mints unique, time-ordered u64 identifiers for a given prefix.
#[derive(Clone)]
pub struct IdGenerator {
    store: Arc<dyn KeyValueStore>,
}

impl IdGenerator {
    /// Creates a generator over the given store.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Returns the next id for `prefix`.
    ///
    /// Ids for a fixed prefix are unique within a calendar day and
    /// monotonically increasing across seconds. The counter bucket rolls
    /// over by key name at midnight UTC (`icr:<prefix>:<yyyy:MM:dd>`), so
    /// no counter reset is ever issued.
    pub async fn next_id(&self, prefix: &str) -> Result<u64> {
        let now = Utc::now();
        let elapsed = (now.timestamp() - ID_EPOCH_SECS) as u64;

        let sequence = self.store.increment(&bucket_key(prefix, &now)).await? as u64;

        Ok(compose_id(elapsed, sequence))
    }
}
