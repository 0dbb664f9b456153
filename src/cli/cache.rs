//! Cache management commands

use std::sync::Arc;

use colored::Colorize;

use crate::actions::{ClearAction, ClearOutcome, clear_probe};
use crate::cache::{ProbeIdentity, SqliteStore, SystemClock};
use crate::cli::args::GlobalOptions;
use crate::cli::context::{cache_dir, load_optional_config};
use crate::cli::{ClearArgs, ClearTarget, OutputFormat, RequestClearArgs, SiteClearArgs};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::output::formatters::format_timestamp_local;
use crate::probe::ProbeRunner;
use crate::probes::database::count_identity;
use crate::probes::{INVALID_METAS_KIND, ORPHAN_FILES_KIND};

struct CacheHandle {
    store: SqliteStore,
    path: std::path::PathBuf,
    config: Option<Config>,
    format: OutputFormat,
}

fn open(opts: &GlobalOptions) -> Result<CacheHandle> {
    let config = load_optional_config(opts)?;
    let path = cache_dir(opts, config.as_ref())?;
    let store = SqliteStore::open_at(&path)?;
    let format = opts.format_or(config.as_ref().and_then(|c| c.preferences.format.as_deref()));

    Ok(CacheHandle {
        store,
        path,
        config,
        format,
    })
}

/// Show cache status/statistics
pub fn status(opts: &GlobalOptions) -> Result<()> {
    let cache = open(opts)?;
    let stats = cache.store.stats()?;

    match cache.format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "total_entries": stats.total_entries,
                "valid_entries": stats.valid_entries,
                "expired_entries": stats.expired_entries,
                "oldest_entry_timestamp": stats.oldest_entry,
                "newest_entry_timestamp": stats.newest_entry,
                "path": cache.path.display().to_string(),
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        _ => {
            println!("Cache Status");
            println!("────────────────────────────────────────");
            println!("Location:       {}", cache.path.display());
            println!("Valid entries:  {}", stats.valid_entries);
            println!("Expired:        {}", stats.expired_entries);

            if stats.oldest_entry.is_some() {
                println!("Oldest entry:   {}", format_timestamp_local(stats.oldest_entry));
            }
            if stats.newest_entry.is_some() {
                println!("Newest entry:   {}", format_timestamp_local(stats.newest_entry));
            }
        }
    }

    Ok(())
}

/// Clear every cached result, or a single one
pub fn clear(args: &ClearArgs, opts: &GlobalOptions) -> Result<()> {
    let cache = open(opts)?;

    if args.all {
        return clear_all(&cache);
    }

    let Some(target) = &args.target else {
        return Err(Error::Other(
            "Nothing to clear. Pass --all or one of: request, invalid-metas, orphan-files"
                .to_string(),
        ));
    };

    let request = resolve(target, cache.config.as_ref())?;
    let ttl = cache
        .config
        .as_ref()
        .map(|c| c.cache.ttl())
        .unwrap_or(crate::cache::DEFAULT_TTL);
    let runner = ProbeRunner::new(Some(&cache.store), Arc::new(SystemClock)).with_default_ttl(ttl);
    let outcome = request.execute(&runner)?;

    print_outcome(&outcome, cache.format)
}

/// A clear target, either named by its cache suffix or rebuilt from the
/// probe's inputs
#[derive(Debug)]
enum ClearRequest {
    Suffix(ClearAction),
    Probe(ProbeIdentity),
}

impl ClearRequest {
    fn execute(&self, runner: &ProbeRunner<'_>) -> Result<ClearOutcome> {
        match self {
            ClearRequest::Suffix(action) => action.execute(runner),
            ClearRequest::Probe(identity) => clear_probe(identity, runner),
        }
    }
}

/// Map the CLI target to what it clears
fn resolve(target: &ClearTarget, config: Option<&Config>) -> Result<ClearRequest> {
    match target {
        ClearTarget::Request(RequestClearArgs {
            cache: Some(suffix),
            ..
        }) => Ok(ClearRequest::Suffix(ClearAction::Request {
            cache: suffix.clone(),
        })),
        ClearTarget::Request(RequestClearArgs {
            url: Some(url),
            method,
            ..
        }) => {
            let method = method.as_deref().unwrap_or("GET");
            Ok(ClearRequest::Probe(ProbeIdentity::request(url.as_str(), method)))
        }
        ClearTarget::Request(_) => Err(Error::Other(
            "A request is identified by --cache or --url".to_string(),
        )),
        ClearTarget::InvalidMetas(SiteClearArgs {
            cache: Some(suffix),
        }) => Ok(ClearRequest::Suffix(ClearAction::InvalidWpMetas {
            cache: suffix.clone(),
        })),
        ClearTarget::OrphanFiles(SiteClearArgs {
            cache: Some(suffix),
        }) => Ok(ClearRequest::Suffix(ClearAction::OrphanFiles {
            cache: suffix.clone(),
        })),
        ClearTarget::InvalidMetas(_) => site_count(INVALID_METAS_KIND, config),
        ClearTarget::OrphanFiles(_) => site_count(ORPHAN_FILES_KIND, config),
    }
}

/// Count probes are keyed by the site database, so rebuild the identity
/// from the loaded config
fn site_count(kind: &str, config: Option<&Config>) -> Result<ClearRequest> {
    let site = config.map(|c| &c.site);
    let Some((path, prefix)) =
        site.and_then(|s| s.database.as_deref().map(|db| (db, s.table_prefix.as_str())))
    else {
        return Err(Error::Other(
            "No site database configured. Pass --cache with the suffix from the report"
                .to_string(),
        ));
    };

    Ok(ClearRequest::Probe(count_identity(kind, path, prefix)))
}

fn clear_all(cache: &CacheHandle) -> Result<()> {
    let stats = cache.store.clear_all()?;

    match cache.format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "entries_removed": stats.entries_removed,
                "success": true,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        _ => {
            if stats.entries_removed > 0 {
                println!("Cleared {} cache entries", stats.entries_removed);
            } else {
                println!("Cache was already empty");
            }
        }
    }

    Ok(())
}

fn print_outcome(outcome: &ClearOutcome, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(outcome)?),
        _ => println!(
            "{} Cleared {} ({})",
            "✓".green(),
            outcome.key,
            outcome.action.dimmed()
        ),
    }
    Ok(())
}

/// Show cache path
pub fn path(opts: &GlobalOptions) -> Result<()> {
    let config = load_optional_config(opts)?;
    let path = cache_dir(opts, config.as_ref())?;
    println!("{}", path.display());
    Ok(())
}
