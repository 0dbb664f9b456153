//! Individual diagnostic checks
//!
//! Each probe is a thin I/O wrapper; caching is the runner's job.

pub mod database;
pub mod filesystem;
pub mod requests;
pub mod server;

pub use database::SiteDatabase;
pub use requests::ReqwestProber;

/// Cache kind for the invalid attachment metadata count
pub const INVALID_METAS_KIND: &str = "medias_invalid_wp_metas";

/// Cache kind for the orphan custom files count
pub const ORPHAN_FILES_KIND: &str = "orphan_files";
