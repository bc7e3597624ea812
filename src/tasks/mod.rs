//! Background Tasks Module
//!
//! Contains background tasks that run periodically while the core is in
//! use.
//!
//! # Tasks
//! - TTL sweep: reclaims expired memory-store entries (sentinels and
//!   expired lock records) that nothing reads again

mod sweeper;

pub use sweeper::spawn_sweeper_task;
