//! Report assembly
//!
//! Runs every probe through the build's [`ProbeRunner`] and turns the
//! outcomes into report rows.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use crate::actions::ClearAction;
use crate::cache::ProbeIdentity;
use crate::config::Config;
use crate::error::{ProbeError, Result};
use crate::probe::{ProbeResult, ProbeRunner};
use crate::probes::requests::{self, HttpProber, with_scheme};
use crate::probes::database::count_identity;
use crate::probes::{
    INVALID_METAS_KIND, ORPHAN_FILES_KIND, SiteDatabase, filesystem as fs, server,
};
use crate::report::{CacheHint, Report, ReportRow, Section};

/// `action` parameter of the loopback test endpoints
pub const LOOPBACK_ACTION: &str = "sitediag_test";

/// External collaborators a report build reads from
pub struct ReportContext<'a> {
    pub config: &'a Config,
    pub http: &'a dyn HttpProber,
    /// Server variables, already filtered and sanitized
    pub server: &'a BTreeMap<String, String>,
}

/// Build the full diagnostics report.
///
/// # Errors
/// Only when a probe identity cannot be turned into a cache key, which means
/// the configuration names an unusable URL.
pub async fn build_report(ctx: &ReportContext<'_>, runner: &mut ProbeRunner<'_>) -> Result<Report> {
    let ttl = ctx.config.cache.ttl();

    let sections = vec![
        filesystem_section(ctx.config),
        requests_section(ctx, runner, ttl).await?,
        attachments_section(ctx.config, runner, ttl).await?,
        various_section(ctx),
        server_section(ctx.server),
    ];

    log::debug!("Report built, {} probe results memoized", runner.memo().len());
    Ok(Report { sections })
}

fn cache_hint(runner: &ProbeRunner<'_>, identity: &ProbeIdentity) -> Result<Option<CacheHint>> {
    if !runner.is_persistent() {
        return Ok(None);
    }
    let Some(action) = ClearAction::for_key(&identity.cache_key()?) else {
        return Ok(None);
    };
    Ok(Some(CacheHint::new(&action, runner.remaining_ttl(identity)?)))
}

fn attach_hint(row: ReportRow, hint: Option<CacheHint>) -> ReportRow {
    match hint {
        Some(hint) => row.with_cache(hint),
        None => row,
    }
}

fn filesystem_section(config: &Config) -> Section {
    let site = &config.site;
    let root = site.root.as_path();
    let root_display = root.display().to_string();
    let mut section = Section::new("Filesystem Tests");

    section.push(
        ReportRow::check("Site root", &root_display, !fs::path_is_absolute(root))
            .with_info("Should be an absolute path."),
    );

    section.push(match &site.plugin_path {
        Some(path) => ReportRow::check(
            "Plugin path",
            path.display(),
            !fs::path_is_absolute(path),
        )
        .with_info("Should be an absolute path."),
        None => ReportRow::check("Plugin path", "Not defined", false)
            .with_info("Should be an absolute path."),
    });

    let uploads = site.uploads_dir();
    let under_root_hint = format!("Should be an absolute path and start with {}.", root_display);
    section.push(
        ReportRow::check(
            "Uploads path",
            uploads.display(),
            !fs::is_absolute_under(&uploads, root),
        )
        .with_info(&under_root_hint),
    );

    let uploads_url = site.uploads_url();
    section.push(
        ReportRow::check("Uploads URL", &uploads_url, !fs::is_valid_url(&uploads_url))
            .with_info("Should be a valid URL."),
    );

    section.push(
        ReportRow::compare(
            "Backups folder exists and is writable",
            fs::is_writable_dir(&site.backup_dir()),
            site.backup_enabled,
        )
        .with_info(if site.backup_enabled {
            "Backup is enabled."
        } else {
            "No need, backup is disabled."
        }),
    );

    section.push(mode_row(
        "FS_CHMOD_DIR",
        site.chmod_dir,
        fs::expected_dir_mode(root),
    ));
    section.push(mode_row(
        "FS_CHMOD_FILE",
        site.chmod_file,
        fs::expected_file_mode(root),
    ));

    section
}

fn mode_row(
    label: &str,
    configured: Option<u32>,
    expected: std::result::Result<u32, ProbeError>,
) -> ReportRow {
    match (configured, expected) {
        (None, Ok(expected)) => ReportRow::info(label, "Not defined")
            .with_info(format!("Should be {}.", fs::describe_mode(expected))),
        (None, Err(_)) => ReportRow::info(label, "Not defined"),
        (Some(mode), Ok(expected)) => ReportRow::compare(
            label,
            fs::describe_mode(mode),
            fs::describe_mode(expected),
        )
        .with_info(format!("Should be {}.", fs::describe_mode(expected))),
        (Some(mode), Err(e)) => {
            ReportRow::check(label, fs::describe_mode(mode), true).with_info(e.to_string())
        }
    }
}

fn request_label(url: &str, method: &str) -> String {
    let shown = url
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(url)
        .trim_end_matches('/');

    if method.eq_ignore_ascii_case("GET") {
        format!("Requests to {} blocked", shown)
    } else {
        format!("Requests to {} blocked ({})", shown, method.to_ascii_uppercase())
    }
}

async fn probe_request(
    ctx: &ReportContext<'_>,
    runner: &mut ProbeRunner<'_>,
    ttl: Duration,
    url: &str,
    method: &str,
) -> Result<(ProbeResult, Option<CacheHint>)> {
    let identity = ProbeIdentity::request(url, method);
    let http = ctx.http;
    let site = &ctx.config.site;
    let domain = ctx.config.requests.service_domain.as_str();

    let result = runner
        .run_probe(&identity, ttl, move || {
            requests::check_reachability(http, site, domain, url, method)
        })
        .await?;

    Ok((result, cache_hint(runner, &identity)?))
}

async fn request_row(
    ctx: &ReportContext<'_>,
    runner: &mut ProbeRunner<'_>,
    ttl: Duration,
    url: &str,
    method: &str,
) -> Result<ReportRow> {
    let (result, hint) = probe_request(ctx, runner, ttl, url, method).await?;
    Ok(attach_hint(
        ReportRow::from_probe(request_label(url, method), &result),
        hint,
    ))
}

async fn requests_section(
    ctx: &ReportContext<'_>,
    runner: &mut ProbeRunner<'_>,
    ttl: Duration,
) -> Result<Section> {
    let config = ctx.config;
    let mut section = Section::new("Requests Tests");

    section.push(ReportRow::info(
        "Outbound requests blocked by site policy",
        config.site.block_external,
    ));

    for target in &config.requests.targets {
        section.push(request_row(ctx, runner, ttl, &target.url, &target.method).await?);
    }

    if !config.requests.loopback {
        return Ok(section);
    }

    let query = format!("?action={}", LOOPBACK_ACTION);
    let ajax_url = config.site.admin_url_for(&format!("admin-ajax.php{}", query));
    let post_url = config.site.admin_url_for(&format!("admin-post.php{}", query));
    let cron_url = config.site.site_url("wp-cron.php");

    section.push(request_row(ctx, runner, ttl, &ajax_url, "POST").await?);

    // Served from this build's memo, the row above already ran it
    let (ajax, _) = probe_request(ctx, runner, ttl, &ajax_url, "POST").await?;
    if !ajax.is_ok() && ajax_url.starts_with("https://") {
        let fallbacks = [
            with_scheme(&post_url, "https"),
            with_scheme(&cron_url, "https"),
            with_scheme(&ajax_url, "http"),
            with_scheme(&post_url, "http"),
            with_scheme(&cron_url, "http"),
        ];

        for url in &fallbacks {
            section.push(request_row(ctx, runner, ttl, url, "POST").await?);
        }
    }

    Ok(section)
}

fn count_result(count: u64) -> ProbeResult {
    if count == 0 {
        ProbeResult::Ok
    } else {
        ProbeResult::Problem(count.to_string())
    }
}

fn count_row(label: &str, result: &ProbeResult) -> ReportRow {
    match result {
        ProbeResult::Ok => ReportRow::check(label, 0, false),
        ProbeResult::Problem(count) => ReportRow::check(label, count, true),
        ProbeResult::Error(detail) => ReportRow::check(label, "Error", true).with_info(detail),
    }
}

async fn attachments_section(
    config: &Config,
    runner: &mut ProbeRunner<'_>,
    ttl: Duration,
) -> Result<Section> {
    let mut section = Section::new("Attachments");

    let Some(path) = config.site.database.as_deref() else {
        section.push(
            ReportRow::info("Site database", "Not configured")
                .with_info("Set site.database to enable attachment checks."),
        );
        return Ok(section);
    };

    let db = match SiteDatabase::open(path, &config.site.table_prefix) {
        Ok(db) => db,
        Err(e) => {
            section.push(ReportRow::check("Site database", path.display(), true).with_info(e.to_string()));
            return Ok(section);
        }
    };

    let prefix = config.site.table_prefix.as_str();
    section.push(invalid_metas_row(&db, path, prefix, runner, ttl).await?);

    let folders_ready = db.folders_table_ready().unwrap_or(false);
    let files_ready = db.files_table_ready().unwrap_or(false);
    section.push(ReportRow::compare("Folders table is ready", folders_ready, true));
    section.push(ReportRow::compare("Files table is ready", files_ready, true));

    if folders_ready && files_ready {
        section.push(orphan_files_row(&db, path, prefix, runner, ttl).await?);
    }

    Ok(section)
}

async fn invalid_metas_row(
    db: &SiteDatabase,
    path: &Path,
    prefix: &str,
    runner: &mut ProbeRunner<'_>,
    ttl: Duration,
) -> Result<ReportRow> {
    let identity = count_identity(INVALID_METAS_KIND, path, prefix);
    let result = runner
        .run_probe(&identity, ttl, move || async move {
            db.count_attachments_with_invalid_metadata().map(count_result)
        })
        .await?;

    let hint = cache_hint(runner, &identity)?;
    Ok(attach_hint(
        count_row("Attachments with invalid or missing WP metas", &result),
        hint,
    ))
}

async fn orphan_files_row(
    db: &SiteDatabase,
    path: &Path,
    prefix: &str,
    runner: &mut ProbeRunner<'_>,
    ttl: Duration,
) -> Result<ReportRow> {
    let identity = count_identity(ORPHAN_FILES_KIND, path, prefix);
    let result = runner
        .run_probe(&identity, ttl, move || async move {
            match db.count_orphan_files() {
                Ok(Some(count)) => Ok(count_result(count)),
                Ok(None) => Err(ProbeError::Database(
                    "custom folders or files table is missing".to_string(),
                )),
                Err(e) => Err(e),
            }
        })
        .await?;

    let hint = cache_hint(runner, &identity)?;
    Ok(attach_hint(count_row("Orphan files count", &result), hint))
}

fn various_section(ctx: &ReportContext<'_>) -> Section {
    let config = ctx.config;
    let mut section = Section::new("Various Tests and Values");

    section.push(ReportRow::info("sitediag version", env!("CARGO_PKG_VERSION")));
    section.push(ReportRow::info("Site URL", &config.site.url));
    section.push(ReportRow::info("Admin URL", config.site.admin_url()));

    let claims_ssl = server::site_claims_ssl(&config.site);
    let is_ssl = server::detect_ssl(&config.site, ctx.server);
    let ssl_row = ReportRow::compare("Is SSL", claims_ssl, is_ssl);
    section.push(if claims_ssl != is_ssl {
        ssl_row.with_info(
            "The site URL scheme does not match how the site is served; \
             it could be a problem related with the way SSL is implemented.",
        )
    } else {
        ssl_row
    });

    section.push(ReportRow::info(
        "Backup enabled",
        config.site.backup_enabled,
    ));
    section.push(ReportRow::info(
        "Probe cache duration",
        format!("{} minutes", config.cache.ttl().as_secs() / 60),
    ));

    section
}

fn server_section(server: &BTreeMap<String, String>) -> Section {
    let mut section = Section::new("Server Variables");

    if server.is_empty() {
        section.push(ReportRow::info("Server variables", "None found"));
    }

    for (name, value) in server {
        section.push(ReportRow::info(name.as_str(), value));
    }

    section
}

/// Whether a path looks like a site root, used by `init`
pub fn looks_like_site_root(path: &Path) -> bool {
    path.join("wp-config.php").exists() || path.join("wp-load.php").exists()
}
