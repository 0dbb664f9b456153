//! CLI command definitions and handlers

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
pub use clap_complete::Shell;

pub mod args;
pub mod cache;
pub mod completions;
pub mod context;
pub mod init;
pub mod report;
pub mod status;

pub use args::OutputFormat;
pub use context::CommandContext;

/// sitediag - diagnostics dashboard for WordPress image-optimization setups
#[derive(Parser, Debug)]
#[command(name = "sitediag")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (pretty, table, json)
    #[arg(
        long,
        global = true,
        env = "SITEDIAG_FORMAT",
        hide_env = true,
        hide_possible_values = true
    )]
    pub format: Option<OutputFormat>,

    /// Override config file location
    #[arg(long, global = true, env = "SITEDIAG_CONFIG", hide_env = true)]
    pub config: Option<String>,

    /// Override probe cache directory
    #[arg(long, global = true, env = "SITEDIAG_CACHE_DIR", hide_env = true)]
    pub cache_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true, env = "SITEDIAG_DEBUG", hide_env = true)]
    pub debug: bool,

    /// Run every probe, ignoring and not updating cached results
    #[arg(long, global = true, env = "SITEDIAG_NO_CACHE", hide_env = true)]
    pub no_cache: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the sitediag configuration
    Init,

    /// Show configuration and cache status
    Status,

    /// Display version information
    Version,

    /// Run all diagnostics and print the report
    Report,

    /// Manage cached probe results
    #[command(subcommand)]
    Cache(CacheCommands),

    /// Generate shell completions
    #[command(after_help = "\
Examples:
  bash:   sitediag completion bash > /etc/bash_completion.d/sitediag
  zsh:    sitediag completion zsh > \"${fpath[1]}/_sitediag\"
  fish:   sitediag completion fish > ~/.config/fish/completions/sitediag.fish")]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Cache management subcommands
#[derive(Subcommand, Debug)]
pub enum CacheCommands {
    /// Show cache statistics
    Status,

    /// Clear cached probe results
    #[command(args_conflicts_with_subcommands = true)]
    Clear(ClearArgs),

    /// Print the cache directory path
    Path,
}

/// Which cached results to clear
#[derive(Args, Debug)]
pub struct ClearArgs {
    /// Clear every cached probe result
    #[arg(long)]
    pub all: bool,

    #[command(subcommand)]
    pub target: Option<ClearTarget>,
}

/// A single cached probe result
#[derive(Subcommand, Debug)]
pub enum ClearTarget {
    /// One request check, by cache suffix or by URL
    Request(RequestClearArgs),

    /// The count of attachments with invalid or missing WP metas
    InvalidMetas(SiteClearArgs),

    /// The count of orphan custom files
    OrphanFiles(SiteClearArgs),
}

#[derive(Args, Debug)]
pub struct RequestClearArgs {
    /// Cache suffix shown in the report hint (10 hex characters)
    #[arg(long, conflicts_with = "url", required_unless_present = "url")]
    pub cache: Option<String>,

    /// URL of the request check
    #[arg(long)]
    pub url: Option<String>,

    /// HTTP method of the request check (defaults to GET)
    #[arg(long)]
    pub method: Option<String>,
}

#[derive(Args, Debug)]
pub struct SiteClearArgs {
    /// Cache suffix shown in the report hint; derived from the configured
    /// site database when omitted
    #[arg(long)]
    pub cache: Option<String>,
}
