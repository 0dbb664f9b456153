//! Global CLI options shared across all commands
//!
//! Collects the global flags once so handlers take a single argument.

use std::path::{Path, PathBuf};

use crate::cli::{Cli, OutputFormat};

/// Global CLI options passed to all command handlers.
///
/// # Precedence
///
/// CLI flag > environment variable > config file > default. This struct
/// captures the CLI/env layer; config file values are resolved later in
/// `CommandContext`.
#[derive(Debug, Clone)]
pub struct GlobalOptions {
    /// Output format, `None` when neither flag nor env var was given
    pub format: Option<OutputFormat>,

    /// Custom config file path (defaults to ~/.sitediag/config.yaml)
    pub config: Option<String>,

    /// Custom probe cache directory
    pub cache_dir: Option<PathBuf>,

    /// Skip the persistent probe cache for this run
    pub no_cache: bool,
}

impl GlobalOptions {
    /// Create GlobalOptions from a parsed CLI struct.
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            format: cli.format,
            config: cli.config.clone(),
            cache_dir: cli.cache_dir.clone(),
            no_cache: cli.no_cache,
        }
    }

    /// Get config path as `Option<&str>`.
    pub fn config_ref(&self) -> Option<&str> {
        self.config.as_deref()
    }

    /// Get cache directory override as `Option<&Path>`.
    pub fn cache_dir_ref(&self) -> Option<&Path> {
        self.cache_dir.as_deref()
    }

    /// Output format with the config preference as fallback
    pub fn format_or(&self, preference: Option<&str>) -> OutputFormat {
        self.format
            .or_else(|| preference.and_then(OutputFormat::from_preference))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(format: Option<OutputFormat>) -> GlobalOptions {
        GlobalOptions {
            format,
            config: Some("/custom/config.yaml".to_string()),
            cache_dir: Some(PathBuf::from("/tmp/sitediag-cache")),
            no_cache: true,
        }
    }

    #[test]
    fn test_global_options_accessors() {
        let opts = opts(None);

        assert_eq!(opts.config_ref(), Some("/custom/config.yaml"));
        assert_eq!(opts.cache_dir_ref(), Some(Path::new("/tmp/sitediag-cache")));
        assert!(opts.no_cache);
    }

    #[test]
    fn test_format_precedence() {
        assert_eq!(opts(None).format_or(None), OutputFormat::Pretty);
        assert_eq!(opts(None).format_or(Some("json")), OutputFormat::Json);
        assert_eq!(
            opts(Some(OutputFormat::Table)).format_or(Some("json")),
            OutputFormat::Table
        );
        assert_eq!(opts(None).format_or(Some("bogus")), OutputFormat::Pretty);
    }
}
