//! Status command implementation

use colored::Colorize;

use crate::cache::SqliteStore;
use crate::cli::args::GlobalOptions;
use crate::cli::context::cache_dir;
use crate::config::Config;
use crate::error::Result;

/// Run the status command to display configuration status
pub fn run(opts: &GlobalOptions) -> Result<()> {
    println!("{}\n", "sitediag Configuration Status".bold());

    let config_path = Config::resolve_path(opts.config_ref())?;

    match Config::load_from(&config_path) {
        Ok(config) => {
            println!("Config file: {}", config_path.display().to_string().cyan());
            println!();

            let site = &config.site;
            println!("{} Site URL: {}", "✓".green(), site.url);
            println!("{} Site root: {}", "✓".green(), site.root.display());

            match &site.database {
                Some(db) if db.exists() => {
                    println!("{} Site database: {}", "✓".green(), db.display())
                }
                Some(db) => println!(
                    "{} Site database not found: {}",
                    "✗".red(),
                    db.display()
                ),
                None => {
                    println!("{} No site database configured", "○".dimmed());
                    println!("  → Set site.database to enable attachment checks");
                }
            }

            println!(
                "{} {} request targets, loopback checks {}",
                "○".dimmed(),
                config.requests.targets.len(),
                if config.requests.loopback {
                    "on"
                } else {
                    "off"
                }
            );

            print_cache_status(opts, &config);
            println!();
        }
        Err(e) => {
            println!("{} {}", "✗".red(), e);
            println!();
            println!(
                "Run {} to create a configuration file.",
                "sitediag init".cyan()
            );
            println!();
        }
    }

    Ok(())
}

fn print_cache_status(opts: &GlobalOptions, config: &Config) {
    let ttl_minutes = config.cache.ttl().as_secs() / 60;

    if opts.no_cache {
        println!("{} Probe cache disabled (--no-cache)", "○".dimmed());
        return;
    }

    let dir = match cache_dir(opts, Some(config)) {
        Ok(dir) => dir,
        Err(e) => {
            println!("{} Probe cache unavailable: {}", "⚠".yellow(), e);
            return;
        }
    };

    match SqliteStore::open_at(&dir).and_then(|store| store.stats()) {
        Ok(stats) => println!(
            "{} Probe cache: {} valid entries, results kept {} minutes ({})",
            "✓".green(),
            stats.valid_entries,
            ttl_minutes,
            dir.display().to_string().dimmed()
        ),
        Err(e) => println!("{} Probe cache unavailable: {}", "⚠".yellow(), e),
    }
}
