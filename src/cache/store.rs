//! Transient store abstraction, plus an in-memory store for tests

use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::error::CacheError;

#[cfg(test)]
pub use memory::MemoryStore;

type Result<T> = std::result::Result<T, CacheError>;

/// Key-value store with per-entry expiration.
///
/// Implementations must treat an entry whose expiration has passed as absent
/// in `get`, whether or not it has been purged yet. Writers are not
/// coordinated across processes; the last `set` wins.
pub trait TransientStore: Send + Sync {
    /// Stored value if present and not expired.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value`, replacing any prior entry, expiring `ttl` from now.
    ///
    /// A zero `ttl`, or one shorter than the store's millisecond resolution,
    /// is rejected with [`CacheError::InvalidTtl`].
    fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Remove the entry. Removing an absent key is not an error.
    fn delete(&self, key: &str) -> Result<()>;

    /// Absolute expiration of a known key, even if it already lapsed.
    fn expires_at(&self, key: &str) -> Result<Option<DateTime<Utc>>>;
}

/// Convert a TTL to the absolute expiration timestamp
pub(crate) fn expiry_from(now: DateTime<Utc>, ttl: Duration) -> Result<DateTime<Utc>> {
    if ttl < Duration::from_millis(1) {
        return Err(CacheError::InvalidTtl);
    }
    let ttl = chrono::Duration::from_std(ttl).map_err(|_| CacheError::InvalidTtl)?;
    now.checked_add_signed(ttl).ok_or(CacheError::InvalidTtl)
}

#[cfg(test)]
mod memory {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::cache::clock::{Clock, SystemClock};

    #[derive(Debug, Clone)]
    struct MemoryEntry {
        value: String,
        expires_at: DateTime<Utc>,
    }

    /// Process-local transient store
    pub struct MemoryStore {
        entries: Mutex<HashMap<String, MemoryEntry>>,
        clock: Arc<dyn Clock>,
    }

    impl MemoryStore {
        pub fn new() -> Self {
            Self::with_clock(Arc::new(SystemClock))
        }

        pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
            Self {
                entries: Mutex::new(HashMap::new()),
                clock,
            }
        }

        /// Number of stored entries, expired ones included
        pub fn len(&self) -> usize {
            self.entries.lock().map(|e| e.len()).unwrap_or(0)
        }

        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }

        fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, MemoryEntry>>> {
            self.entries
                .lock()
                .map_err(|_| CacheError::Io("memory store lock poisoned".to_string()))
        }
    }

    impl Default for MemoryStore {
        fn default() -> Self {
            Self::new()
        }
    }

    impl TransientStore for MemoryStore {
        fn get(&self, key: &str) -> Result<Option<String>> {
            let now = self.clock.now();
            let mut entries = self.lock()?;

            match entries.get(key) {
                Some(entry) if entry.expires_at > now => Ok(Some(entry.value.clone())),
                Some(_) => {
                    entries.remove(key);
                    Ok(None)
                }
                None => Ok(None),
            }
        }

        fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
            let expires_at = expiry_from(self.clock.now(), ttl)?;
            self.lock()?.insert(
                key.to_string(),
                MemoryEntry {
                    value: value.to_string(),
                    expires_at,
                },
            );
            Ok(())
        }

        fn delete(&self, key: &str) -> Result<()> {
            self.lock()?.remove(key);
            Ok(())
        }

        fn expires_at(&self, key: &str) -> Result<Option<DateTime<Utc>>> {
            Ok(self.lock()?.get(key).map(|e| e.expires_at))
        }
    }
}
