use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::tempdir;

fn sitediag() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("sitediag"));
    cmd.env_remove("SITEDIAG_CONFIG")
        .env_remove("SITEDIAG_CACHE_DIR")
        .env_remove("SITEDIAG_FORMAT")
        .env_remove("SITEDIAG_NO_CACHE")
        .env_remove("SITEDIAG_DEBUG");
    cmd
}

fn write_config(temp: &Path, targets: &[&str]) -> PathBuf {
    let path = temp.join("config.yaml");
    let targets = if targets.is_empty() {
        "  targets: []\n".to_string()
    } else {
        let items: String = targets
            .iter()
            .map(|url| format!("    - url: {}\n", url))
            .collect();
        format!("  targets:\n{}", items)
    };
    let contents = format!(
        "site:\n  root: {}\n  url: https://shop.example.com\nrequests:\n{}  loopback: false\n",
        temp.display(),
        targets
    );
    fs::write(&path, contents).expect("failed to write config");
    path
}

#[test]
fn version_prints_package_version() {
    sitediag()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn status_uses_custom_config_path() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;
    let config_path = write_config(temp.path(), &[]);

    let assert = sitediag()
        .arg("status")
        .arg("--config")
        .arg(&config_path)
        .arg("--cache-dir")
        .arg(temp.path().join("cache"))
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&assert.get_output().stdout);
    assert!(stdout.contains("Site URL: https://shop.example.com"));
    assert!(stdout.contains(&config_path.to_string_lossy().to_string()));
    assert!(stdout.contains("No site database configured"));

    Ok(())
}

#[test]
fn status_without_config_suggests_init() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;

    sitediag()
        .arg("status")
        .arg("--config")
        .arg(temp.path().join("absent.yaml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("sitediag init"));

    Ok(())
}

#[test]
fn report_without_config_fails() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;

    sitediag()
        .arg("report")
        .arg("--config")
        .arg(temp.path().join("absent.yaml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error: Configuration file not found"));

    Ok(())
}

#[test]
fn report_json_has_all_sections() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;
    let config_path = write_config(temp.path(), &[]);

    let assert = sitediag()
        .arg("report")
        .arg("--format")
        .arg("json")
        .arg("--config")
        .arg(&config_path)
        .arg("--cache-dir")
        .arg(temp.path().join("cache"))
        .assert()
        .success();

    let parsed: serde_json::Value = serde_json::from_slice(&assert.get_output().stdout)?;
    let titles: Vec<&str> = parsed["data"]["sections"]
        .as_array()
        .expect("sections array")
        .iter()
        .filter_map(|s| s["title"].as_str())
        .collect();

    assert_eq!(
        titles,
        vec![
            "Filesystem Tests",
            "Requests Tests",
            "Attachments",
            "Various Tests and Values",
            "Server Variables"
        ]
    );
    assert_eq!(parsed["meta"]["version"], env!("CARGO_PKG_VERSION"));

    Ok(())
}

#[test]
fn report_table_format() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;
    let config_path = write_config(temp.path(), &[]);

    sitediag()
        .arg("report")
        .arg("--format")
        .arg("table")
        .arg("--no-cache")
        .arg("--config")
        .arg(&config_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("SECTION"))
        .stdout(predicate::str::contains("Filesystem Tests"));

    Ok(())
}

#[cfg_attr(not(feature = "http-tests"), ignore)]
#[test]
fn report_reuses_cached_request_results() -> Result<(), Box<dyn std::error::Error>> {
    let mut server = mockito::Server::new();
    let url = format!("{}/api/version/", server.url());

    let version = server
        .mock("GET", "/api/version/")
        .with_status(200)
        .expect(1)
        .create();

    let temp = tempdir()?;
    let config_path = write_config(temp.path(), &[&url]);
    let cache_dir = temp.path().join("cache");

    for _ in 0..2 {
        let assert = sitediag()
            .arg("report")
            .arg("--format")
            .arg("json")
            .arg("--config")
            .arg(&config_path)
            .arg("--cache-dir")
            .arg(&cache_dir)
            .assert()
            .success();

        let stdout = String::from_utf8_lossy(&assert.get_output().stdout);
        assert!(stdout.contains("sitediag cache clear request --cache"));
    }

    version.assert();

    sitediag()
        .arg("cache")
        .arg("clear")
        .arg("request")
        .arg("--url")
        .arg(&url)
        .arg("--cache-dir")
        .arg(&cache_dir)
        .arg("--config")
        .arg(&config_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Cleared sitediag_req_"));

    Ok(())
}

#[cfg_attr(not(feature = "http-tests"), ignore)]
#[test]
fn report_flags_blocked_request() -> Result<(), Box<dyn std::error::Error>> {
    let mut server = mockito::Server::new();
    let url = format!("{}/wpm.png", server.url());

    let _blocked = server.mock("GET", "/wpm.png").with_status(403).create();

    let temp = tempdir()?;
    let config_path = write_config(temp.path(), &[&url]);

    sitediag()
        .arg("report")
        .arg("--format")
        .arg("json")
        .arg("--no-cache")
        .arg("--config")
        .arg(&config_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("http code is 403 Forbidden"));

    Ok(())
}

#[test]
fn cache_path_honors_override() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;
    let cache_dir = temp.path().join("probe-cache");

    sitediag()
        .arg("cache")
        .arg("path")
        .arg("--config")
        .arg(temp.path().join("absent.yaml"))
        .arg("--cache-dir")
        .arg(&cache_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains(cache_dir.to_string_lossy().to_string()));

    Ok(())
}

#[test]
fn cache_clear_all_on_empty_store() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;

    sitediag()
        .arg("cache")
        .arg("clear")
        .arg("--all")
        .arg("--config")
        .arg(temp.path().join("absent.yaml"))
        .arg("--cache-dir")
        .arg(temp.path().join("cache"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Cache was already empty"));

    Ok(())
}

#[test]
fn cache_clear_named_target_reports_key() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;

    sitediag()
        .arg("cache")
        .arg("clear")
        .arg("orphan-files")
        .arg("--cache")
        .arg("0a1b2c3d4e")
        .arg("--format")
        .arg("json")
        .arg("--config")
        .arg(temp.path().join("absent.yaml"))
        .arg("--cache-dir")
        .arg(temp.path().join("cache"))
        .assert()
        .success()
        .stdout(predicate::str::contains("sitediag_clear_orphan_files_cache"))
        .stdout(predicate::str::contains("sitediag_orphan_files_0a1b2c3d4e"));

    Ok(())
}

#[test]
fn cache_clear_count_keys_by_configured_database() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;
    let cache_dir = temp.path().join("cache");

    let mut keys = Vec::new();
    for site in ["a", "b"] {
        let dir = temp.path().join(site);
        fs::create_dir_all(&dir)?;
        let config_path = dir.join("config.yaml");
        fs::write(
            &config_path,
            format!(
                "site:\n  root: {root}\n  url: https://{site}.example.com\n  database: {root}/site.db\n",
                root = dir.display(),
                site = site
            ),
        )?;

        let assert = sitediag()
            .arg("cache")
            .arg("clear")
            .arg("invalid-metas")
            .arg("--format")
            .arg("json")
            .arg("--config")
            .arg(&config_path)
            .arg("--cache-dir")
            .arg(&cache_dir)
            .assert()
            .success();

        let parsed: serde_json::Value = serde_json::from_slice(&assert.get_output().stdout)?;
        let key = parsed["key"].as_str().unwrap_or_default().to_string();
        assert!(key.starts_with("sitediag_medias_invalid_wp_metas_"));
        keys.push(key);
    }

    assert_ne!(keys[0], keys[1]);

    Ok(())
}

#[test]
fn cache_clear_count_without_database_fails() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;

    sitediag()
        .arg("cache")
        .arg("clear")
        .arg("orphan-files")
        .arg("--config")
        .arg(temp.path().join("absent.yaml"))
        .arg("--cache-dir")
        .arg(temp.path().join("cache"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("No site database configured"));

    Ok(())
}

#[test]
fn cache_clear_rejects_bad_suffix() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;

    sitediag()
        .arg("cache")
        .arg("clear")
        .arg("request")
        .arg("--cache")
        .arg("not-a-key")
        .arg("--config")
        .arg(temp.path().join("absent.yaml"))
        .arg("--cache-dir")
        .arg(temp.path().join("cache"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));

    Ok(())
}

#[test]
fn cache_clear_without_target_fails() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;

    sitediag()
        .arg("cache")
        .arg("clear")
        .arg("--config")
        .arg(temp.path().join("absent.yaml"))
        .arg("--cache-dir")
        .arg(temp.path().join("cache"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Nothing to clear"));

    Ok(())
}

#[test]
fn completion_generates_bash_script() {
    sitediag()
        .arg("completion")
        .arg("bash")
        .assert()
        .success()
        .stdout(predicate::str::contains("sitediag"));
}
