//! Cachegate - cache-consistency and concurrency-admission primitives
//!
//! Provides cache-aside coordination (penetration and breakdown guards,
//! logical expiration), distributed locking with ownership tokens,
//! time-ordered id generation, and flash-sale admission control, all over
//! a narrow key-value store contract.
//!
//! This crate is a library consumed in-process by the surrounding
//! application; it exposes no network surface of its own.

pub mod cache;
pub mod config;
pub mod error;
pub mod id;
pub mod lock;
pub mod seckill;
pub mod store;
pub mod tasks;

pub use cache::{CacheCoordinator, CachedValue};
pub use config::Config;
pub use error::{GateError, Result};
pub use id::IdGenerator;
pub use lock::{LockHandle, LockProvider, LockToken, StoreLock, StoreLockProvider};
pub use seckill::{AdmissionController, MemoryVoucherRepository, Voucher, VoucherOrder, VoucherRepository};
pub use store::{KeyValueStore, MemoryStore};
pub use tasks::spawn_sweeper_task;
