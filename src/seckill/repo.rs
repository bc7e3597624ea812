//! Voucher Repository Module
//!
//! The narrow contract over the relational source of truth for vouchers
//! and orders, plus an in-process reference implementation.
//!
//! The conditional decrement models `UPDATE seckill_voucher SET stock =
//! stock - 1 WHERE id = ? AND stock > 0`: the guard is evaluated at
//! commit time, so it is the authoritative defense against overselling.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::seckill::{Voucher, VoucherOrder};

// == Voucher Repository Contract ==
/// Operations the admission flow needs from the relational store.
#[async_trait]
pub trait VoucherRepository: Send + Sync {
    /// Loads a voucher by id.
    async fn voucher(&self, voucher_id: u64) -> Result<Option<Voucher>>;

    /// Decrements remaining stock by one, guarded by `stock > 0` at
    /// commit time. Returns false when the guard failed (zero rows
    /// affected).
    async fn decrement_stock(&self, voucher_id: u64) -> Result<bool>;

    /// True if an order for this (buyer, voucher) pair already exists.
    async fn order_exists(&self, buyer_id: u64, voucher_id: u64) -> Result<bool>;

    /// Persists a committed order.
    async fn insert_order(&self, order: VoucherOrder) -> Result<()>;
}

// == Memory Voucher Repository ==
/// In-process reference implementation, used by tests and single-node
/// deployments. The write lock makes check-and-decrement atomic, matching
/// the row-level atomicity a relational store provides.
#[derive(Debug, Default)]
pub struct MemoryVoucherRepository {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    vouchers: HashMap<u64, Voucher>,
    orders: Vec<VoucherOrder>,
}

impl MemoryVoucherRepository {
    /// Creates an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a voucher.
    pub async fn seed_voucher(&self, voucher: Voucher) {
        let mut inner = self.inner.write().await;
        inner.vouchers.insert(voucher.id, voucher);
    }

    /// Remaining stock for a voucher, if it exists.
    pub async fn stock(&self, voucher_id: u64) -> Option<u32> {
        let inner = self.inner.read().await;
        inner.vouchers.get(&voucher_id).map(|v| v.stock)
    }

    /// Snapshot of all committed orders.
    pub async fn orders(&self) -> Vec<VoucherOrder> {
        self.inner.read().await.orders.clone()
    }
}

#[async_trait]
impl VoucherRepository for MemoryVoucherRepository {
    async fn voucher(&self, voucher_id: u64) -> Result<Option<Voucher>> {
        let inner = self.inner.read().await;
        Ok(inner.vouchers.get(&voucher_id).cloned())
    }

    async fn decrement_stock(&self, voucher_id: u64) -> Result<bool> {
        let mut inner = self.inner.write().await;
        match inner.vouchers.get_mut(&voucher_id) {
            Some(voucher) if voucher.stock > 0 => {
                voucher.stock -= 1;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn order_exists(&self, buyer_id: u64, voucher_id: u64) -> Result<bool> {
        let inner = self.inner.read().await;
        Ok(inner
            .orders
            .iter()
            .any(|o| o.buyer_id == buyer_id && o.voucher_id == voucher_id))
    }

    async fn insert_order(&self, order: VoucherOrder) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.orders.push(order);
        Ok(())
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, Utc};

    fn voucher(id: u64, stock: u32) -> Voucher {
        let now = Utc::now();
        Voucher {
            id,
            stock,
            begin_at: now - ChronoDuration::hours(1),
            end_at: now + ChronoDuration::hours(1),
        }
    }

    #[tokio::test]
    async fn test_decrement_respects_guard() {
        let repo = MemoryVoucherRepository::new();
        repo.seed_voucher(voucher(1, 2)).await;

        assert!(repo.decrement_stock(1).await.unwrap());
        assert!(repo.decrement_stock(1).await.unwrap());
        // Guard fails once stock hits zero
        assert!(!repo.decrement_stock(1).await.unwrap());
        assert_eq!(repo.stock(1).await, Some(0));
    }

    #[tokio::test]
    async fn test_decrement_unknown_voucher() {
        let repo = MemoryVoucherRepository::new();
        assert!(!repo.decrement_stock(99).await.unwrap());
    }

    #[tokio::test]
    async fn test_order_exists_per_pair() {
        let repo = MemoryVoucherRepository::new();

        repo.insert_order(VoucherOrder {
            id: 1,
            buyer_id: 10,
            voucher_id: 1,
        })
        .await
        .unwrap();

        assert!(repo.order_exists(10, 1).await.unwrap());
        assert!(!repo.order_exists(10, 2).await.unwrap());
        assert!(!repo.order_exists(11, 1).await.unwrap());
    }
}
