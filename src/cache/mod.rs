//! Transient cache for probe results
//!
//! A small key-value layer with per-entry expiration. The SQLite store
//! persists across runs; the memory store and manual clock back the tests.

pub mod clock;
pub mod key;
pub mod storage;
pub mod store;

use std::time::Duration;

/// Default validity window for cached probe results
pub const DEFAULT_TTL: Duration = Duration::from_secs(30 * 60); // 30 min

// Re-export main types
pub use clock::{Clock, SystemClock};
pub use key::{CacheKey, KEY_NAMESPACE, ProbeIdentity, REQUEST_KIND};
pub use storage::SqliteStore;
pub use store::TransientStore;

#[cfg(test)]
pub use clock::ManualClock;
#[cfg(test)]
pub use store::MemoryStore;
