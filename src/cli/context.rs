//! Command execution context
//!
//! Loads the configuration and opens the probe cache once per command.

use std::path::PathBuf;
use std::sync::Arc;

use crate::cache::{SqliteStore, SystemClock, TransientStore};
use crate::cli::OutputFormat;
use crate::cli::args::GlobalOptions;
use crate::config::Config;
use crate::error::{ConfigError, Error, Result};
use crate::probe::ProbeRunner;

/// Context for command execution containing config, store and output format.
pub struct CommandContext {
    /// Loaded and validated configuration
    pub config: Config,
    /// Persistent probe cache, `None` with `--no-cache` or when it cannot be opened
    pub store: Option<SqliteStore>,
    /// Output format preference
    pub format: OutputFormat,
}

impl CommandContext {
    /// Create a context for commands that run probes.
    ///
    /// A store that fails to open only degrades caching for this run.
    ///
    /// # Errors
    /// Returns error if the config cannot be loaded or is invalid.
    pub fn new(opts: &GlobalOptions) -> Result<Self> {
        let config = Config::load_at(opts.config_ref())?;
        let format = opts.format_or(config.preferences.format.as_deref());

        let store = if opts.no_cache {
            log::debug!("Probe cache disabled for this run");
            None
        } else {
            let dir = cache_dir(opts, Some(&config))?;
            match SqliteStore::open_at(&dir) {
                Ok(store) => Some(store),
                Err(e) => {
                    log::warn!("Probe cache unavailable at {}: {}", dir.display(), e);
                    None
                }
            }
        };

        Ok(Self {
            config,
            store,
            format,
        })
    }

    /// Probe runner for one report build or clear action
    pub fn runner(&self) -> ProbeRunner<'_> {
        let store = self.store.as_ref().map(|s| s as &dyn TransientStore);
        ProbeRunner::new(store, Arc::new(SystemClock)).with_default_ttl(self.config.cache.ttl())
    }
}

/// Load the config if there is one; a missing file is not an error here
pub fn load_optional_config(opts: &GlobalOptions) -> Result<Option<Config>> {
    match Config::load_at(opts.config_ref()) {
        Ok(config) => Ok(Some(config)),
        Err(Error::Config(ConfigError::NotFound)) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Resolve the store directory: flag/env, then config, then the user cache dir
pub fn cache_dir(opts: &GlobalOptions, config: Option<&Config>) -> Result<PathBuf> {
    if let Some(dir) = opts.cache_dir_ref() {
        return Ok(dir.to_path_buf());
    }

    if let Some(dir) = config.and_then(|c| c.cache.dir.clone()) {
        return Ok(dir);
    }

    Ok(SqliteStore::cache_dir()?)
}
