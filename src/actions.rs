//! Operator-triggered cache clear actions

use serde::Serialize;

use crate::cache::{CacheKey, ProbeIdentity, REQUEST_KIND};
use crate::error::{Error, Result};
use crate::probe::ProbeRunner;
use crate::probes::{INVALID_METAS_KIND, ORPHAN_FILES_KIND};

/// A request to forget one cached probe result, identified by its cache
/// suffix
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClearAction {
    /// One request check
    Request { cache: String },
    /// The invalid attachment metadata count of one site database
    InvalidWpMetas { cache: String },
    /// The orphan custom files count of one site database
    OrphanFiles { cache: String },
}

/// What a clear action did, for JSON output
#[derive(Debug, Serialize)]
pub struct ClearOutcome {
    pub action: &'static str,
    pub key: String,
    pub success: bool,
}

impl ClearAction {
    /// Clear action for an already-derived key
    pub fn for_key(key: &CacheKey) -> Option<Self> {
        let cache = key.suffix().to_string();
        match key.kind() {
            REQUEST_KIND => Some(ClearAction::Request { cache }),
            INVALID_METAS_KIND => Some(ClearAction::InvalidWpMetas { cache }),
            ORPHAN_FILES_KIND => Some(ClearAction::OrphanFiles { cache }),
            _ => None,
        }
    }

    /// Namespaced action name
    pub fn action_name(&self) -> &'static str {
        match self {
            ClearAction::Request { .. } => "sitediag_clear_request_cache",
            ClearAction::InvalidWpMetas { .. } => {
                "sitediag_clear_medias_with_invalid_wp_metas_cache"
            }
            ClearAction::OrphanFiles { .. } => "sitediag_clear_orphan_files_cache",
        }
    }

    /// The key this action removes
    pub fn cache_key(&self) -> Result<CacheKey> {
        match self {
            ClearAction::Request { cache } => CacheKey::from_suffix(REQUEST_KIND, cache),
            ClearAction::InvalidWpMetas { cache } => {
                CacheKey::from_suffix(INVALID_METAS_KIND, cache)
            }
            ClearAction::OrphanFiles { cache } => CacheKey::from_suffix(ORPHAN_FILES_KIND, cache),
        }
    }

    /// Command line that triggers this action
    pub fn command_hint(&self) -> String {
        match self {
            ClearAction::Request { cache } => {
                format!("sitediag cache clear request --cache {}", cache)
            }
            ClearAction::InvalidWpMetas { cache } => {
                format!("sitediag cache clear invalid-metas --cache {}", cache)
            }
            ClearAction::OrphanFiles { cache } => {
                format!("sitediag cache clear orphan-files --cache {}", cache)
            }
        }
    }

    /// Delete the entry. Nothing is recomputed until the next report.
    pub fn execute(&self, runner: &ProbeRunner<'_>) -> Result<ClearOutcome> {
        let key = self.cache_key()?;
        runner.invalidate_key(&key)?;
        Ok(self.outcome(&key))
    }

    fn outcome(&self, key: &CacheKey) -> ClearOutcome {
        log::info!("{} cleared {}", self.action_name(), key);
        ClearOutcome {
            action: self.action_name(),
            key: key.as_store_key(),
            success: true,
        }
    }
}

/// Delete the entry of a probe named by its inputs rather than its suffix
pub fn clear_probe(identity: &ProbeIdentity, runner: &ProbeRunner<'_>) -> Result<ClearOutcome> {
    let key = identity.cache_key()?;
    let action = ClearAction::for_key(&key)
        .ok_or_else(|| Error::Other(format!("No clear action for {}", key)))?;

    runner.invalidate(identity)?;
    Ok(action.outcome(&key))
}
