//! Filesystem layout and permission checks

use std::path::Path;

use reqwest::Url;

use crate::error::ProbeError;

/// Whether `path` is absolute
pub fn path_is_absolute(path: &Path) -> bool {
    path.is_absolute()
}

/// Whether `path` is absolute and lives below `root`
pub fn is_absolute_under(path: &Path, root: &Path) -> bool {
    path.is_absolute() && path.starts_with(root)
}

/// Whether `url` has both a scheme and a host
pub fn is_valid_url(url: &str) -> bool {
    Url::parse(url)
        .map(|u| !u.scheme().is_empty() && u.host_str().is_some_and(|h| !h.is_empty()))
        .unwrap_or(false)
}

/// Whether `path` is an existing directory the current user may write to
pub fn is_writable_dir(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|m| m.is_dir() && !m.permissions().readonly())
        .unwrap_or(false)
}

/// Permission bits of `path`
#[cfg(unix)]
pub fn mode_of(path: &Path) -> Result<u32, ProbeError> {
    use std::os::unix::fs::PermissionsExt;

    std::fs::metadata(path)
        .map(|m| m.permissions().mode())
        .map_err(|e| ProbeError::Filesystem(format!("{}: {}", path.display(), e)))
}

#[cfg(not(unix))]
pub fn mode_of(path: &Path) -> Result<u32, ProbeError> {
    Err(ProbeError::Filesystem(format!(
        "{}: permission bits are not available on this platform",
        path.display()
    )))
}

/// Expected directory mode, derived from the install root
pub fn expected_dir_mode(root: &Path) -> Result<u32, ProbeError> {
    Ok(mode_of(root)? & 0o777 | 0o755)
}

/// Expected file mode, derived from the root `index.php`
pub fn expected_file_mode(root: &Path) -> Result<u32, ProbeError> {
    Ok(mode_of(&root.join("index.php"))? & 0o777 | 0o644)
}

/// Render a mode as its last four octal digits, e.g. `0644`
pub fn to_octal(mode: u32) -> String {
    let octal = format!("0{:o}", mode);
    octal[octal.len().saturating_sub(4)..].to_string()
}

/// Render a mode the way the dashboard shows it: `0755 (493)`
pub fn describe_mode(mode: u32) -> String {
    format!("{} ({})", to_octal(mode), mode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::tempdir;

    #[test]
    fn test_to_octal() {
        assert_eq!(to_octal(0o644), "0644");
        assert_eq!(to_octal(0o755), "0755");
        assert_eq!(to_octal(0o100644), "0644");
        assert_eq!(to_octal(0o40755), "0755");
        assert_eq!(to_octal(0), "00");
    }

    #[test]
    fn test_describe_mode() {
        assert_eq!(describe_mode(0o755), "0755 (493)");
        assert_eq!(describe_mode(0o644), "0644 (420)");
    }

    #[test]
    fn test_is_absolute_under() {
        let root = PathBuf::from("/srv/www");

        assert!(is_absolute_under(Path::new("/srv/www/wp-content/uploads"), &root));
        assert!(!is_absolute_under(Path::new("/tmp/uploads"), &root));
        assert!(!is_absolute_under(Path::new("wp-content/uploads"), &root));
        assert!(!is_absolute_under(Path::new("/srv/www2/uploads"), &root));
    }

    #[test]
    fn test_is_valid_url() {
        assert!(is_valid_url("https://example.com/wp-content/uploads"));
        assert!(!is_valid_url("/wp-content/uploads"));
        assert!(!is_valid_url("mailto:someone@example.com"));
    }

    #[test]
    fn test_is_writable_dir() {
        let dir = tempdir().unwrap();
        assert!(is_writable_dir(dir.path()));
        assert!(!is_writable_dir(&dir.path().join("missing")));

        let file = dir.path().join("file.txt");
        std::fs::write(&file, "x").unwrap();
        assert!(!is_writable_dir(&file));
    }

    #[cfg(unix)]
    #[test]
    fn test_expected_modes() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        std::fs::set_permissions(dir.path(), std::fs::Permissions::from_mode(0o750)).unwrap();
        let index = dir.path().join("index.php");
        std::fs::write(&index, "<?php").unwrap();
        std::fs::set_permissions(&index, std::fs::Permissions::from_mode(0o600)).unwrap();

        assert_eq!(expected_dir_mode(dir.path()).unwrap(), 0o755);
        assert_eq!(expected_file_mode(dir.path()).unwrap(), 0o644);
    }

    #[test]
    fn test_mode_of_missing_path() {
        let dir = tempdir().unwrap();
        assert!(mode_of(&dir.path().join("missing")).is_err());
    }
}
