//! Configuration management for sitediag

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::{DEFAULT_TTL, ProbeIdentity};
use crate::error::{ConfigError, Result};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// The WordPress install being diagnosed
    pub site: SiteConfig,

    /// Outbound request checks
    #[serde(default)]
    pub requests: RequestsConfig,

    /// Probe result cache
    #[serde(default)]
    pub cache: CacheConfig,

    /// User preferences
    #[serde(default)]
    pub preferences: Preferences,
}

/// Site layout and policy, the values WordPress would expose as constants
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Install root (`ABSPATH`)
    pub root: PathBuf,

    /// Public site URL
    pub url: String,

    /// Admin URL, defaults to `<url>/wp-admin/`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_url: Option<String>,

    /// Uploads directory, defaults to `<root>/wp-content/uploads`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploads_dir: Option<PathBuf>,

    /// Uploads base URL, defaults to `<url>/wp-content/uploads`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploads_url: Option<String>,

    /// Optimization plugin install path, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin_path: Option<PathBuf>,

    /// Configured directory mode (`FS_CHMOD_DIR`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chmod_dir: Option<u32>,

    /// Configured file mode (`FS_CHMOD_FILE`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chmod_file: Option<u32>,

    /// SQLite site database, enables the attachment checks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<PathBuf>,

    /// Table prefix used by the site database
    #[serde(default = "default_table_prefix")]
    pub table_prefix: String,

    /// Whether image backups are enabled in the plugin settings
    #[serde(default)]
    pub backup_enabled: bool,

    /// Block outbound requests except to the site and accessible hosts
    #[serde(default)]
    pub block_external: bool,

    /// Hosts still reachable when `block_external` is on
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub accessible_hosts: Vec<String>,
}

fn default_table_prefix() -> String {
    "wp_".to_string()
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("/var/www/html"),
            url: "http://localhost".to_string(),
            admin_url: None,
            uploads_dir: None,
            uploads_url: None,
            plugin_path: None,
            chmod_dir: None,
            chmod_file: None,
            database: None,
            table_prefix: default_table_prefix(),
            backup_enabled: false,
            block_external: false,
            accessible_hosts: Vec::new(),
        }
    }
}

impl SiteConfig {
    pub fn admin_url(&self) -> String {
        self.admin_url
            .clone()
            .unwrap_or_else(|| format!("{}/wp-admin/", self.url.trim_end_matches('/')))
    }

    /// Site URL joined with a path relative to the install root
    pub fn site_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Admin URL joined with a path relative to `wp-admin/`
    pub fn admin_url_for(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.admin_url().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.uploads_dir
            .clone()
            .unwrap_or_else(|| self.root.join("wp-content").join("uploads"))
    }

    pub fn uploads_url(&self) -> String {
        self.uploads_url
            .clone()
            .unwrap_or_else(|| self.site_url("wp-content/uploads"))
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.uploads_dir().join("backup")
    }
}

/// Outbound request checks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestsConfig {
    /// Remote endpoints the site must be able to reach
    #[serde(default = "default_targets")]
    pub targets: Vec<RequestTarget>,

    /// Domain of the optimization service; changes the blocked-request hint
    #[serde(default = "default_service_domain")]
    pub service_domain: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Verify TLS certificates (loopback requests usually use self-signed ones)
    #[serde(default)]
    pub verify_tls: bool,

    /// Also probe the site's own admin-ajax / admin-post / cron endpoints
    #[serde(default = "default_true")]
    pub loopback: bool,
}

/// One outbound request check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestTarget {
    pub url: String,

    #[serde(default = "default_method")]
    pub method: String,
}

impl RequestTarget {
    pub fn get(url: &str) -> Self {
        Self {
            url: url.to_string(),
            method: default_method(),
        }
    }
}

fn default_targets() -> Vec<RequestTarget> {
    vec![
        RequestTarget::get("https://imagify.io"),
        RequestTarget::get("https://app.imagify.io/api/version/"),
        RequestTarget::get("https://s2-amz-par.imagify.io/wpm.png"),
        RequestTarget::get("http://storage.imagify.io/images/index.png"),
    ]
}

fn default_service_domain() -> String {
    "imagify.io".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_method() -> String {
    "GET".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for RequestsConfig {
    fn default() -> Self {
        Self {
            targets: default_targets(),
            service_domain: default_service_domain(),
            timeout_secs: default_timeout_secs(),
            verify_tls: false,
            loopback: true,
        }
    }
}

/// Probe result cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// How long probe results stay valid
    #[serde(default = "default_ttl_minutes")]
    pub ttl_minutes: u64,

    /// Store location, defaults to the user cache directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

fn default_ttl_minutes() -> u64 {
    DEFAULT_TTL.as_secs() / 60
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_minutes: default_ttl_minutes(),
            dir: None,
        }
    }
}

impl CacheConfig {
    /// Validity window for cached probe results, at least one minute
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_minutes.max(1) * 60)
    }
}

/// User preferences
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Preferences {
    /// Default output format
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::Invalid(
            "Could not determine home directory".to_string(),
        ))?;

        Ok(home.join(".sitediag").join("config.yaml"))
    }

    /// Resolve an optional override to a concrete config path
    pub fn resolve_path(path: Option<&str>) -> Result<PathBuf> {
        match path {
            Some(p) => Ok(PathBuf::from(p)),
            None => Self::default_path(),
        }
    }

    /// Load configuration from an optional override path
    pub fn load_at(path: Option<&str>) -> Result<Self> {
        Self::load_from(&Self::resolve_path(path)?)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound.into());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents).map_err(ConfigError::from)?;
        config.validate()?;

        Ok(config)
    }

    /// Save configuration to an optional override path
    pub fn save_at(&self, path: Option<&str>) -> Result<()> {
        self.save_to(&Self::resolve_path(path)?)
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents =
            serde_yaml::to_string(self).map_err(|e| ConfigError::SaveError(e.to_string()))?;

        std::fs::write(path, contents)?;

        // Set file permissions to 600 on Unix systems
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(path)?.permissions();
            perms.set_mode(0o600);
            std::fs::set_permissions(path, perms)?;
        }

        Ok(())
    }

    /// Check the values every report depends on
    pub fn validate(&self) -> Result<()> {
        if self.site.root.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("site.root is empty".to_string()).into());
        }

        let url = reqwest::Url::parse(&self.site.url)
            .map_err(|e| ConfigError::Invalid(format!("site.url '{}': {}", self.site.url, e)))?;
        if url.host_str().is_none() {
            return Err(ConfigError::Invalid(format!("site.url '{}' has no host", self.site.url)).into());
        }

        // Same rules the report applies when it keys each request check
        for target in &self.requests.targets {
            ProbeIdentity::request(target.url.as_str(), &target.method)
                .cache_key()
                .map_err(|e| ConfigError::Invalid(format!("request target: {}", e)))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.cache.ttl(), DEFAULT_TTL);
        assert_eq!(config.site.table_prefix, "wp_");
        assert_eq!(config.requests.targets.len(), 4);
        assert!(config.requests.loopback);
    }

    #[test]
    fn test_minimal_yaml_fills_defaults() {
        let yaml = "site:\n  root: /srv/www\n  url: https://example.com\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.site.admin_url(), "https://example.com/wp-admin/");
        assert_eq!(
            config.site.uploads_dir(),
            PathBuf::from("/srv/www/wp-content/uploads")
        );
        assert_eq!(
            config.site.uploads_url(),
            "https://example.com/wp-content/uploads"
        );
        assert_eq!(config.cache.ttl_minutes, 30);
        config.validate().unwrap();
    }

    #[test]
    fn test_admin_url_for() {
        let site = SiteConfig {
            url: "https://example.com/".to_string(),
            ..Default::default()
        };

        assert_eq!(
            site.admin_url_for("admin-ajax.php"),
            "https://example.com/wp-admin/admin-ajax.php"
        );
        assert_eq!(site.site_url("/wp-cron.php"), "https://example.com/wp-cron.php");
    }

    #[test]
    fn test_ttl_never_zero() {
        let cache = CacheConfig {
            ttl_minutes: 0,
            dir: None,
        };
        assert_eq!(cache.ttl(), Duration::from_secs(60));
    }

    #[test]
    fn test_validate_rejects_bad_url() {
        let mut config = Config::default();
        config.site.url = "example.com".to_string();

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unusable_targets() {
        for (url, method) in [
            ("mailto:ops@example.com", "GET"),
            ("https://imagify.io", "M-SEARCH"),
            ("not a url", "GET"),
        ] {
            let mut config = Config::default();
            config.requests.targets = vec![RequestTarget {
                url: url.to_string(),
                method: method.to_string(),
            }];

            let err = config.validate().unwrap_err();
            assert!(
                err.to_string().contains("request target"),
                "{} {}: {}",
                method,
                url,
                err
            );
        }
    }

    #[test]
    fn test_load_rejects_bad_method() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "site:\n  root: /srv/www\n  url: https://shop.example.com\n\
             requests:\n  targets:\n    - url: https://imagify.io\n      method: M-SEARCH\n",
        )
        .unwrap();

        assert!(matches!(
            Config::load_from(&path),
            Err(crate::error::Error::Config(ConfigError::Invalid(_)))
        ));
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");

        let mut config = Config::default();
        config.site.url = "https://roundtrip.example".to_string();
        config.cache.ttl_minutes = 5;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.site.url, "https://roundtrip.example");
        assert_eq!(loaded.cache.ttl_minutes, 5);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        let result = Config::load_from(&dir.path().join("absent.yaml"));

        assert!(matches!(
            result,
            Err(crate::error::Error::Config(ConfigError::NotFound))
        ));
    }
}
