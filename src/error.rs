//! Error types for the cache-consistency core
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Gate Error Enum ==
/// Unified error type for cache, lock, id-generation and admission flows.
///
/// A cached "confirmed absent" is NOT an error; it is surfaced as
/// `Ok(None)` by the cache operations. Variants here cover infrastructure
/// failures and business rejections only.
#[derive(Error, Debug)]
pub enum GateError {
    /// A store operation (network/timeout) failed
    #[error("Store operation failed: {0}")]
    Store(String),

    /// A cached payload could not be encoded or decoded
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A non-blocking lock attempt found the lock already held
    #[error("Lock unavailable: {0}")]
    LockUnavailable(String),

    /// A blocking lock attempt exhausted its wait budget
    #[error("Lock acquisition timed out: {0}")]
    LockTimeout(String),

    /// The mutex rebuild path exhausted its retry budget
    #[error("Cache rebuild retries exhausted for key: {0}")]
    RebuildTimeout(String),

    /// The caller-supplied fetch-from-source callback failed
    #[error("Source fetch failed: {0}")]
    SourceFetch(String),

    /// No voucher exists under the requested id
    #[error("Voucher not found: {0}")]
    VoucherMissing(u64),

    /// Purchase attempted before the sale window opened
    #[error("Sale has not started for voucher {0}")]
    SaleNotStarted(u64),

    /// Purchase attempted after the sale window closed
    #[error("Sale has ended for voucher {0}")]
    SaleEnded(u64),

    /// Conditional stock decrement affected zero rows
    #[error("Insufficient stock for voucher {0}")]
    StockExhausted(u64),

    /// Another purchase attempt by the same buyer is in flight
    #[error("Duplicate request in flight for buyer {0}")]
    DuplicateRequest(u64),

    /// An order for this (buyer, voucher) pair already exists
    #[error("Buyer {buyer_id} already purchased voucher {voucher_id}")]
    AlreadyPurchased { buyer_id: u64, voucher_id: u64 },
}

impl GateError {
    /// True for business-level rejections of a purchase attempt, as opposed
    /// to infrastructure failures. Rejections are terminal and must not be
    /// retried by callers (retrying would not change the outcome).
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            GateError::SaleNotStarted(_)
                | GateError::SaleEnded(_)
                | GateError::StockExhausted(_)
                | GateError::DuplicateRequest(_)
                | GateError::AlreadyPurchased { .. }
        )
    }
}

// == Result Type Alias ==
/// Convenience Result type for the crate.
pub type Result<T> = std::result::Result<T, GateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_classification() {
        assert!(GateError::StockExhausted(1).is_rejection());
        assert!(GateError::DuplicateRequest(7).is_rejection());
        assert!(GateError::SaleNotStarted(1).is_rejection());
        assert!(!GateError::Store("timeout".to_string()).is_rejection());
        assert!(!GateError::LockTimeout("order:1".to_string()).is_rejection());
    }

    #[test]
    fn test_error_display() {
        let err = GateError::AlreadyPurchased {
            buyer_id: 42,
            voucher_id: 9,
        };
        assert_eq!(err.to_string(), "Buyer 42 already purchased voucher 9");
    }
}
