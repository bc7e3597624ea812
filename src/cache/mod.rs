//! Cache Module
//!
//! Cache-aside strategies over the shared store: pass-through with
//! null-caching, mutex-guarded rebuild, and logical expiration with
//! asynchronous rebuild. Callers supply the fetch-from-source function;
//! the coordinator decides who hits the source and who waits.

mod coordinator;
mod payload;


// Re-export public types
pub use coordinator::CacheCoordinator;
pub use payload::CachedValue;
