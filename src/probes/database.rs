//! Site database checks
//!
//! Runs against a WordPress database stored in SQLite.

use rusqlite::{Connection, OpenFlags, OptionalExtension, params_from_iter};
use std::path::Path;

use crate::cache::ProbeIdentity;
use crate::error::ProbeError;

/// Mime types the optimizer handles, keyed by the file extensions they use
pub const MIME_TYPES: &[(&str, &str)] = &[
    ("jpg|jpeg|jpe", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
];

/// Post statuses attachments can have
pub const ATTACHMENT_STATUSES: &[&str] = &["inherit", "private"];

/// Identity of a count probe against one site database.
///
/// Every configured site shares the same cache directory, so the database
/// file and its table prefix are part of the identity.
pub fn count_identity(kind: &str, path: &Path, prefix: &str) -> ProbeIdentity {
    let path = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    ProbeIdentity::named(kind)
        .with_part(path.display().to_string())
        // prefixed posts table, never empty
        .with_part(format!("{}posts", prefix))
}

/// Read-only handle on the site database
pub struct SiteDatabase {
    conn: Connection,
    prefix: String,
}

impl SiteDatabase {
    pub fn open(path: &Path, prefix: &str) -> Result<Self, ProbeError> {
        if !prefix.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(ProbeError::Database(format!(
                "invalid table prefix '{}'",
                prefix
            )));
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        Ok(Self {
            conn,
            prefix: prefix.to_string(),
        })
    }

    /// Prefixed table name
    pub fn table(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }

    pub fn table_exists(&self, name: &str) -> Result<bool, ProbeError> {
        let found: Option<String> = self
            .conn
            .query_row(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [self.table(name)],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Whether the optimizer's custom folders table can be used
    pub fn folders_table_ready(&self) -> Result<bool, ProbeError> {
        self.table_exists("imagify_folders")
    }

    /// Whether the optimizer's custom files table can be used
    pub fn files_table_ready(&self) -> Result<bool, ProbeError> {
        self.table_exists("imagify_files")
    }

    /// Count image attachments whose `_wp_attached_file` or
    /// `_wp_attachment_metadata` is missing or cannot be worked with: a URL
    /// instead of a relative path, a Windows absolute path, or a file name
    /// with an unsupported extension.
    pub fn count_attachments_with_invalid_metadata(&self) -> Result<u64, ProbeError> {
        let extensions: Vec<&str> = MIME_TYPES
            .iter()
            .flat_map(|(exts, _)| exts.split('|'))
            .collect();
        let extension_clause = extensions
            .iter()
            .map(|_| "LOWER(m1.meta_value) NOT LIKE ?")
            .collect::<Vec<_>>()
            .join(" AND ");

        let sql = format!(
            "SELECT COUNT(p.ID)
             FROM {posts} AS p
             LEFT JOIN {postmeta} AS m1
                 ON (p.ID = m1.post_id AND m1.meta_key = '_wp_attached_file')
             LEFT JOIN {postmeta} AS m2
                 ON (p.ID = m2.post_id AND m2.meta_key = '_wp_attachment_metadata')
             WHERE p.post_mime_type IN ({mimes})
                 AND p.post_type = 'attachment'
                 AND p.post_status IN ({statuses})
                 AND (m2.meta_value IS NULL
                     OR m1.meta_value IS NULL
                     OR m1.meta_value LIKE '%://%'
                     OR m1.meta_value LIKE '_:\\%'
                     OR ({extension_clause}))",
            posts = self.table("posts"),
            postmeta = self.table("postmeta"),
            mimes = placeholders(MIME_TYPES.len()),
            statuses = placeholders(ATTACHMENT_STATUSES.len()),
        );

        let params = MIME_TYPES
            .iter()
            .map(|(_, mime)| mime.to_string())
            .chain(ATTACHMENT_STATUSES.iter().map(|s| s.to_string()))
            .chain(extensions.iter().map(|ext| format!("%.{}", ext)));

        let count: i64 = self
            .conn
            .query_row(&sql, params_from_iter(params), |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    /// Count custom files whose folder no longer exists.
    ///
    /// Returns `None` when either table is missing.
    pub fn count_orphan_files(&self) -> Result<Option<u64>, ProbeError> {
        if !self.folders_table_ready()? || !self.files_table_ready()? {
            return Ok(None);
        }

        let sql = format!(
            "SELECT COUNT(f.file_id) FROM {files} AS f
             WHERE f.folder_id NOT IN (SELECT folder_id FROM {folders})",
            files = self.table("imagify_files"),
            folders = self.table("imagify_folders"),
        );

        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(Some(count.max(0) as u64))
    }
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}
