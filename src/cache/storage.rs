//! SQLite-backed transient store
//!
//! One row per cache key with its absolute expiration in milliseconds,
//! mirroring a site-wide transients table. Expired rows are purged whenever
//! the store is opened.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::cache::KEY_NAMESPACE;
use crate::cache::clock::{Clock, SystemClock};
use crate::cache::store::{TransientStore, expiry_from};
use crate::error::CacheError;

/// Schema version - increment to trigger nuke-and-rebuild
const SCHEMA_VERSION: i32 = 2;

const DB_FILE: &str = "transients.db";

type Result<T> = std::result::Result<T, CacheError>;

/// Persistent transient store
pub struct SqliteStore {
    conn: Mutex<Connection>,
    clock: Arc<dyn Clock>,
}

impl SqliteStore {
    /// Get the cache directory path (~/.cache/sitediag on Linux)
    pub fn cache_dir() -> Result<PathBuf> {
        let cache_base = dirs::cache_dir().ok_or(CacheError::NoHome)?;
        Ok(cache_base.join("sitediag"))
    }

    /// Open the store in a specific directory
    pub fn open_at(cache_dir: &Path) -> Result<Self> {
        Self::open_with_clock(cache_dir, Arc::new(SystemClock))
    }

    /// Open the store with an explicit time source
    pub fn open_with_clock(cache_dir: &Path, clock: Arc<dyn Clock>) -> Result<Self> {
        std::fs::create_dir_all(cache_dir)
            .map_err(|e| CacheError::Io(format!("Failed to create cache dir: {}", e)))?;

        let db_path = cache_dir.join(DB_FILE);
        let conn = Connection::open(&db_path)?;

        // Check schema version - nuke if mismatched
        let version: i32 = conn
            .pragma_query_value(None, "user_version", |r| r.get(0))
            .unwrap_or(0);

        if version != 0 && version != SCHEMA_VERSION {
            log::info!(
                "Cache schema version mismatch ({} != {}), rebuilding",
                version,
                SCHEMA_VERSION
            );
            drop(conn);
            std::fs::remove_file(&db_path)
                .map_err(|e| CacheError::Io(format!("Failed to remove cache DB: {}", e)))?;
            return Self::open_with_clock(cache_dir, clock);
        }

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS transients (
                cache_key TEXT PRIMARY KEY NOT NULL,
                value TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                expires_at_ms INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_expires_at ON transients(expires_at_ms);
            "#,
        )?;

        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;

        let store = Self {
            conn: Mutex::new(conn),
            clock,
        };
        let purged = store.purge_expired()?;
        if purged > 0 {
            log::debug!("Purged {} expired cache entries", purged);
        }

        Ok(store)
    }

    /// Delete this tool's entries whose expiration has passed
    pub fn purge_expired(&self) -> Result<usize> {
        let now = self.clock.now().timestamp_millis();
        let removed = self.conn()?.execute(
            "DELETE FROM transients WHERE cache_key LIKE ?1 AND expires_at_ms <= ?2",
            params![namespace_pattern(), now],
        )?;
        Ok(removed)
    }

    /// Delete every entry this tool wrote
    pub fn clear_all(&self) -> Result<ClearStats> {
        let removed = self.conn()?.execute(
            "DELETE FROM transients WHERE cache_key LIKE ?1",
            [namespace_pattern()],
        )?;

        Ok(ClearStats {
            entries_removed: removed,
        })
    }

    /// Get store statistics
    pub fn stats(&self) -> Result<CacheStats> {
        let now = self.clock.now().timestamp_millis();
        let conn = self.conn()?;
        let pattern = namespace_pattern();

        let total_entries: i64 = conn.query_row(
            "SELECT COUNT(*) FROM transients WHERE cache_key LIKE ?1",
            [&pattern],
            |r| r.get(0),
        )?;

        let valid_entries: i64 = conn.query_row(
            "SELECT COUNT(*) FROM transients WHERE cache_key LIKE ?1 AND expires_at_ms > ?2",
            params![pattern, now],
            |r| r.get(0),
        )?;

        let (oldest, newest): (Option<i64>, Option<i64>) = conn.query_row(
            "SELECT MIN(created_at), MAX(created_at) FROM transients
             WHERE cache_key LIKE ?1 AND expires_at_ms > ?2",
            params![pattern, now],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )?;

        Ok(CacheStats {
            total_entries: total_entries as usize,
            valid_entries: valid_entries as usize,
            expired_entries: (total_entries - valid_entries) as usize,
            oldest_entry: oldest,
            newest_entry: newest,
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| CacheError::Io("cache connection lock poisoned".to_string()))
    }
}

impl TransientStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let now = self.clock.now().timestamp_millis();

        let value = self
            .conn()?
            .query_row(
                "SELECT value FROM transients WHERE cache_key = ?1 AND expires_at_ms > ?2",
                params![key, now],
                |row| row.get(0),
            )
            .optional()?;

        Ok(value)
    }

    fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let now = self.clock.now();
        let expires = expiry_from(now, ttl)?;

        self.conn()?.execute(
            "INSERT OR REPLACE INTO transients (cache_key, value, created_at, expires_at_ms)
             VALUES (?1, ?2, ?3, ?4)",
            params![key, value, now.timestamp(), expires.timestamp_millis()],
        )?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.conn()?
            .execute("DELETE FROM transients WHERE cache_key = ?1", [key])?;
        Ok(())
    }

    fn expires_at(&self, key: &str) -> Result<Option<DateTime<Utc>>> {
        let timestamp: Option<i64> = self
            .conn()?
            .query_row(
                "SELECT expires_at_ms FROM transients WHERE cache_key = ?1",
                [key],
                |row| row.get(0),
            )
            .optional()?;

        match timestamp {
            Some(ts) => DateTime::from_timestamp_millis(ts)
                .map(Some)
                .ok_or_else(|| CacheError::Malformed(format!("expiration {} for {}", ts, key))),
            None => Ok(None),
        }
    }
}

fn namespace_pattern() -> String {
    // `_` is a LIKE wildcard; close enough for a fixed alphanumeric prefix
    format!("{}%", KEY_NAMESPACE)
}

/// Statistics about cache clear operation
#[derive(Debug)]
pub struct ClearStats {
    pub entries_removed: usize,
}

/// Statistics about cache state
#[derive(Debug)]
pub struct CacheStats {
    pub total_entries: usize,
    pub valid_entries: usize,
    pub expired_entries: usize,
    pub oldest_entry: Option<i64>,
    pub newest_entry: Option<i64>,
}
