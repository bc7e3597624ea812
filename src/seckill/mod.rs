//! Seckill Module
//!
//! Admission control for flash-sale purchases: at most one unit per
//! buyer, never oversell, under arbitrary concurrency.
//!
//! The per-buyer lock and the conditional stock decrement split the work:
//! the lock serializes the check-then-insert sequence for one buyer, the
//! decrement's `stock > 0` guard serializes the global count for one
//! voucher. A second click by the same buyer fails fast on the lock
//! rather than queueing; admission is fail-fast by business design,
//! unlike the patient cache-rebuild lock.

mod repo;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{GateError, Result};
use crate::id::IdGenerator;
use crate::lock::LockProvider;
use crate::store::ORDER_LOCK_PREFIX;

// Re-export public types
pub use repo::{MemoryVoucherRepository, VoucherRepository};

// == Domain Types ==
/// A limited-stock flash-sale voucher with its sale window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Voucher {
    /// Voucher id in the source of truth
    pub id: u64,
    /// Remaining sellable units; never below zero
    pub stock: u32,
    /// Start of the sale window (inclusive)
    pub begin_at: DateTime<Utc>,
    /// End of the sale window (exclusive)
    pub end_at: DateTime<Utc>,
}

/// A committed purchase. At most one exists per (buyer, voucher) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoucherOrder {
    /// Time-ordered order id from the id generator
    pub id: u64,
    /// The purchasing buyer
    pub buyer_id: u64,
    /// The purchased voucher
    pub voucher_id: u64,
}

/// Id-generator prefix for order ids.
const ORDER_ID_PREFIX: &str = "order";

// == Admission Controller ==
/// Gates flash-sale purchase attempts.
///
/// Buyer identity is an explicit parameter on every call; the controller
/// holds no ambient request state.
pub struct AdmissionController {
    repo: Arc<dyn VoucherRepository>,
    locks: Arc<dyn LockProvider>,
    ids: IdGenerator,
}

impl AdmissionController {
    /// Creates a controller over the given repository, lock capability and
    /// id generator.
    pub fn new(
        repo: Arc<dyn VoucherRepository>,
        locks: Arc<dyn LockProvider>,
        ids: IdGenerator,
    ) -> Self {
        Self { repo, locks, ids }
    }

    // == Purchase ==
    /// Attempts to sell one unit of `voucher_id` to `buyer_id`.
    ///
    /// Returns the minted order id on success. Rejections
    /// ([`GateError::is_rejection`]) are terminal business outcomes:
    /// outside the sale window, out of stock, a duplicate in-flight
    /// request, or an existing order for this buyer.
    pub async fn purchase(&self, buyer_id: u64, voucher_id: u64) -> Result<u64> {
        let voucher = self
            .repo
            .voucher(voucher_id)
            .await?
            .ok_or(GateError::VoucherMissing(voucher_id))?;

        // 1. Window check
        let now = Utc::now();
        if now < voucher.begin_at {
            return Err(GateError::SaleNotStarted(voucher_id));
        }
        if now >= voucher.end_at {
            return Err(GateError::SaleEnded(voucher_id));
        }

        // 2. Advisory stock pre-check; the decrement below is authoritative
        if voucher.stock == 0 {
            return Err(GateError::StockExhausted(voucher_id));
        }

        // 3. Per-buyer mutual exclusion, fail-fast
        let lock_name = format!("{ORDER_LOCK_PREFIX}{buyer_id}");
        let handle = match self.locks.try_lock(&lock_name).await? {
            Some(handle) => handle,
            None => {
                info!(buyer_id, voucher_id, "duplicate request rejected on lock");
                return Err(GateError::DuplicateRequest(buyer_id));
            }
        };

        // 4-6 run under the lock; the lock is released on every exit path
        let result = self.create_order(buyer_id, voucher_id).await;

        if let Err(err) = self.locks.unlock(handle).await {
            // The lease TTL reclaims the lock; the purchase outcome stands
            warn!(buyer_id, error = %err, "failed to release admission lock");
        }

        result
    }

    /// Steps 4-6: uniqueness check, authoritative decrement, order commit.
    async fn create_order(&self, buyer_id: u64, voucher_id: u64) -> Result<u64> {
        // 4. One order per buyer, ever
        if self.repo.order_exists(buyer_id, voucher_id).await? {
            return Err(GateError::AlreadyPurchased {
                buyer_id,
                voucher_id,
            });
        }

        // 5. Conditional decrement, guard evaluated at commit time
        if !self.repo.decrement_stock(voucher_id).await? {
            return Err(GateError::StockExhausted(voucher_id));
        }

        // 6. Mint the order id and persist
        let order_id = self.ids.next_id(ORDER_ID_PREFIX).await?;
        self.repo
            .insert_order(VoucherOrder {
                id: order_id,
                buyer_id,
                voucher_id,
            })
            .await?;

        info!(buyer_id, voucher_id, order_id, "purchase committed");
        Ok(order_id)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::lock::StoreLockProvider;
    use crate::store::MemoryStore;
    use chrono::Duration as ChronoDuration;
    use std::time::Duration;

    fn controller(repo: Arc<MemoryVoucherRepository>) -> AdmissionController {
        let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());
        let locks = Arc::new(StoreLockProvider::new(
            store.clone(),
            Duration::from_secs(10),
        ));
        AdmissionController::new(repo, locks, IdGenerator::new(store))
    }

    fn open_voucher(id: u64, stock: u32) -> Voucher {
        let now = Utc::now();
        Voucher {
            id,
            stock,
            begin_at: now - ChronoDuration::hours(1),
            end_at: now + ChronoDuration::hours(1),
        }
    }

    #[tokio::test]
    async fn test_purchase_succeeds_and_records_order() {
        let repo = Arc::new(MemoryVoucherRepository::new());
        repo.seed_voucher(open_voucher(1, 5)).await;
        let admission = controller(repo.clone());

        let order_id = admission.purchase(100, 1).await.unwrap();

        let orders = repo.orders().await;
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].id, order_id);
        assert_eq!(orders[0].buyer_id, 100);
        assert_eq!(repo.stock(1).await, Some(4));
    }

    #[tokio::test]
    async fn test_purchase_unknown_voucher() {
        let repo = Arc::new(MemoryVoucherRepository::new());
        let admission = controller(repo);

        let result = admission.purchase(100, 99).await;
        assert!(matches!(result, Err(GateError::VoucherMissing(99))));
    }

    #[tokio::test]
    async fn test_purchase_before_window() {
        let repo = Arc::new(MemoryVoucherRepository::new());
        let now = Utc::now();
        repo.seed_voucher(Voucher {
            id: 1,
            stock: 5,
            begin_at: now + ChronoDuration::hours(1),
            end_at: now + ChronoDuration::hours(2),
        })
        .await;
        let admission = controller(repo);

        let result = admission.purchase(100, 1).await;
        assert!(matches!(result, Err(GateError::SaleNotStarted(1))));
    }

    #[tokio::test]
    async fn test_purchase_after_window() {
        let repo = Arc::new(MemoryVoucherRepository::new());
        let now = Utc::now();
        repo.seed_voucher(Voucher {
            id: 1,
            stock: 5,
            begin_at: now - ChronoDuration::hours(2),
            end_at: now - ChronoDuration::hours(1),
        })
        .await;
        let admission = controller(repo);

        let result = admission.purchase(100, 1).await;
        assert!(matches!(result, Err(GateError::SaleEnded(1))));
    }

    #[tokio::test]
    async fn test_purchase_out_of_stock() {
        let repo = Arc::new(MemoryVoucherRepository::new());
        repo.seed_voucher(open_voucher(1, 0)).await;
        let admission = controller(repo);

        let result = admission.purchase(100, 1).await;
        assert!(matches!(result, Err(GateError::StockExhausted(1))));
    }

    #[tokio::test]
    async fn test_second_purchase_rejected() {
        let repo = Arc::new(MemoryVoucherRepository::new());
        repo.seed_voucher(open_voucher(1, 5)).await;
        let admission = controller(repo.clone());

        admission.purchase(100, 1).await.unwrap();
        let result = admission.purchase(100, 1).await;

        assert!(matches!(
            result,
            Err(GateError::AlreadyPurchased {
                buyer_id: 100,
                voucher_id: 1
            })
        ));
        assert_eq!(repo.orders().await.len(), 1);
        assert_eq!(repo.stock(1).await, Some(4));
    }

    #[tokio::test]
    async fn test_distinct_buyers_each_get_one() {
        let repo = Arc::new(MemoryVoucherRepository::new());
        repo.seed_voucher(open_voucher(1, 5)).await;
        let admission = controller(repo.clone());

        let a = admission.purchase(100, 1).await.unwrap();
        let b = admission.purchase(101, 1).await.unwrap();

        assert_ne!(a, b);
        assert_eq!(repo.stock(1).await, Some(3));
    }
}
