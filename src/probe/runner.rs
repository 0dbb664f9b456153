//! Caching probe runner
//!
//! Each report build owns one [`ProbeRunner`]. A probe is looked up in the
//! build's memo first, then in the transient store, and only executed on a
//! true miss. Its outcome, failures included, is written back with the
//! requested TTL.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{CacheKey, Clock, DEFAULT_TTL, ProbeIdentity, TransientStore};
use crate::error::{ProbeError, Result};
use crate::probe::ProbeResult;

/// Results already produced during the current report build
#[derive(Debug, Default)]
pub struct ProbeMemo {
    results: HashMap<CacheKey, ProbeResult>,
}

impl ProbeMemo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> Option<&ProbeResult> {
        self.results.get(key)
    }

    pub fn insert(&mut self, key: CacheKey, result: ProbeResult) {
        self.results.insert(key, result);
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }
}

/// Memoizing, store-backed executor for diagnostic probes.
///
/// The store is optional: without one (e.g. `--no-cache`) results are only
/// memoized for the current build.
pub struct ProbeRunner<'a> {
    store: Option<&'a dyn TransientStore>,
    clock: Arc<dyn Clock>,
    default_ttl: Duration,
    memo: ProbeMemo,
}

impl<'a> ProbeRunner<'a> {
    pub fn new(store: Option<&'a dyn TransientStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            default_ttl: DEFAULT_TTL,
            memo: ProbeMemo::new(),
        }
    }

    /// Override the TTL reported for keys that are not cached yet
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn memo(&self) -> &ProbeMemo {
        &self.memo
    }

    /// Whether results outlive this build
    pub fn is_persistent(&self) -> bool {
        self.store.is_some()
    }

    /// Run `compute` for `identity` unless a result is already known.
    ///
    /// `compute` runs at most once per identity for the lifetime of this
    /// runner, and not at all while a stored result is valid. Its errors are
    /// captured as [`ProbeResult::Error`] and cached like any other outcome.
    ///
    /// # Errors
    /// Only [`crate::error::Error::InvalidIdentity`]; store failures degrade
    /// to a cache miss.
    pub async fn run_probe<F, Fut>(
        &mut self,
        identity: &ProbeIdentity,
        ttl: Duration,
        compute: F,
    ) -> Result<ProbeResult>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<ProbeResult, ProbeError>>,
    {
        let key = identity.cache_key()?;

        if let Some(result) = self.memo.get(&key) {
            log::debug!("Memo hit: {}", identity);
            return Ok(result.clone());
        }

        if let Some(result) = self.read_cached(&key) {
            log::debug!("Cache hit: {}", identity);
            self.memo.insert(key, result.clone());
            return Ok(result);
        }

        log::debug!("Cache miss: {}, running probe", identity);
        let result = match compute().await {
            Ok(result) => result.normalized(),
            Err(err) => {
                log::debug!("Probe {} failed: {}", identity, err);
                ProbeResult::Error(err.to_string())
            }
        };

        self.write_cached(&key, &result, ttl);
        self.memo.insert(key, result.clone());
        Ok(result)
    }

    /// Drop the stored result for `identity`.
    ///
    /// The memo is left alone and nothing is recomputed; the next build sees
    /// a miss.
    pub fn invalidate(&self, identity: &ProbeIdentity) -> Result<()> {
        let key = identity.cache_key()?;
        self.invalidate_key(&key)
    }

    /// Drop the stored result for an already-derived key
    pub fn invalidate_key(&self, key: &CacheKey) -> Result<()> {
        if let Some(store) = self.store {
            store.delete(&key.as_store_key())?;
            log::debug!("Cleared cache entry {}", key);
        }
        Ok(())
    }

    /// Time until the cached result for `identity` expires, in whole minutes
    /// rounded up. Falls back to the default TTL when nothing valid is stored.
    pub fn remaining_ttl(&self, identity: &ProbeIdentity) -> Result<Duration> {
        let key = identity.cache_key()?;
        let Some(store) = self.store else {
            return Ok(self.default_ttl);
        };

        let expires_at = match store.expires_at(&key.as_store_key()) {
            Ok(Some(expires_at)) => expires_at,
            Ok(None) => return Ok(self.default_ttl),
            Err(e) => {
                log::warn!("Failed to read expiration for {}: {}", key, e);
                return Ok(self.default_ttl);
            }
        };

        let remaining = (expires_at - self.clock.now()).num_milliseconds();
        if remaining <= 0 {
            return Ok(self.default_ttl);
        }

        let minutes = (remaining as u64).div_ceil(60_000);
        Ok(Duration::from_secs(minutes * 60))
    }

    fn read_cached(&self, key: &CacheKey) -> Option<ProbeResult> {
        let store = self.store?;

        let raw = match store.get(&key.as_store_key()) {
            Ok(raw) => raw?,
            Err(e) => {
                log::warn!("Cache read failed for {}: {}", key, e);
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(result) => Some(result),
            Err(e) => {
                log::warn!("Ignoring malformed cache entry {}: {}", key, e);
                None
            }
        }
    }

    fn write_cached(&self, key: &CacheKey, result: &ProbeResult, ttl: Duration) {
        let Some(store) = self.store else {
            return;
        };

        let json = match serde_json::to_string(result) {
            Ok(json) => json,
            Err(e) => {
                log::warn!("Failed to serialize result for {}: {}", key, e);
                return;
            }
        };

        if let Err(e) = store.set(&key.as_store_key(), &json, ttl) {
            log::warn!("Cache write failed for {}: {}", key, e);
        }
    }
}
