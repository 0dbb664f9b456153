//! Init command implementation

use std::path::PathBuf;

use colored::Colorize;
use dialoguer::{Confirm, Input, theme::ColorfulTheme};

use crate::cli::args::GlobalOptions;
use crate::config::{Config, SiteConfig};
use crate::error::Result;
use crate::report::builder::looks_like_site_root;

/// Run the init command
///
/// Existing request and cache settings are kept; only the site section is
/// prompted for.
pub fn run(opts: &GlobalOptions) -> Result<()> {
    println!("{}", "Welcome to sitediag!".bold().green());
    println!("Let's describe the site to diagnose.\n");

    let mut config = Config::load_at(opts.config_ref()).unwrap_or_default();
    let theme = ColorfulTheme::default();

    let default_root = std::env::current_dir()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| config.site.root.display().to_string());
    let root: String = Input::with_theme(&theme)
        .with_prompt("Site root (ABSPATH)")
        .default(default_root)
        .interact_text()?;
    let root = PathBuf::from(root);

    if !looks_like_site_root(&root) {
        println!(
            "{}",
            "⚠ No wp-config.php or wp-load.php found there, continuing anyway.".yellow()
        );
    }

    let url: String = Input::with_theme(&theme)
        .with_prompt("Site URL")
        .default(config.site.url.clone())
        .validate_with(|input: &String| -> std::result::Result<(), String> {
            match reqwest::Url::parse(input) {
                Ok(u) if u.host_str().is_some() => Ok(()),
                _ => Err("Enter a full URL, e.g. https://example.com".to_string()),
            }
        })
        .interact_text()?;

    let database: String = Input::with_theme(&theme)
        .with_prompt("SQLite site database (leave empty to skip attachment checks)")
        .allow_empty(true)
        .interact_text()?;

    let backup_enabled = Confirm::with_theme(&theme)
        .with_prompt("Are image backups enabled?")
        .default(config.site.backup_enabled)
        .interact()?;

    config.site = SiteConfig {
        root,
        url,
        database: (!database.trim().is_empty()).then(|| PathBuf::from(database.trim())),
        backup_enabled,
        ..config.site
    };
    config.validate()?;
    config.save_at(opts.config_ref())?;

    let config_path = Config::resolve_path(opts.config_ref())?;
    println!(
        "\n{} Configuration saved to: {}",
        "✓".green(),
        config_path.display()
    );

    println!("\n{}", "You're all set! Try running:".bold());
    println!("  {} - Show configuration status", "sitediag status".cyan());
    println!("  {} - Run the diagnostics", "sitediag report".cyan());

    Ok(())
}
