//! Reusable formatting utilities for CLI output
//!
//! Timestamps and durations shown by the report and cache commands.

use chrono::{TimeZone, Utc};

/// Format a Unix timestamp (seconds) as a local date/time string.
///
/// Returns "N/A" when the timestamp is missing or out of range.
///
/// # Example output
/// `01/15/2025 14:30 PST`
pub fn format_timestamp_local(timestamp: Option<i64>) -> String {
    let Some(secs) = timestamp else {
        return "N/A".to_string();
    };

    match Utc.timestamp_opt(secs, 0) {
        chrono::LocalResult::Single(dt) => {
            let local = dt.with_timezone(&chrono::Local);
            let date_time = local.format("%m/%d/%Y %H:%M").to_string();
            let tz_abbrev = offset_to_tz_abbrev(local.offset().local_minus_utc());
            format!("{} {}", date_time, tz_abbrev)
        }
        _ => "N/A".to_string(),
    }
}

/// Convert UTC offset (seconds) to timezone abbreviation.
///
/// Maps common UTC offsets to standard timezone abbreviations. Falls back to
/// `UTC+N` format for uncommon offsets.
pub fn offset_to_tz_abbrev(offset_secs: i32) -> String {
    let offset_hours = offset_secs / 3600;
    let abbrev = match offset_hours {
        -10 => "HST",
        -9 => "AKST",
        -8 => "PST",
        -7 => "MST",
        -6 => "CST",
        -5 => "EST",
        -3 => "ART",
        0 => "UTC",
        1 => "CET",
        2 => "EET",
        3 => "MSK",
        9 => "JST",
        10 => "AEST",
        12 => "NZST",
        _ => return format!("UTC{:+}", offset_hours),
    };
    abbrev.to_string()
}

/// Describe how long a cached probe result stays valid.
///
/// # Example output
/// - `cache cleared in less than 1 minute`
/// - `cache cleared in less than 25 minutes`
pub fn format_cache_expiry(minutes: u64) -> String {
    let minutes = minutes.max(1);
    if minutes == 1 {
        "cache cleared in less than 1 minute".to_string()
    } else {
        format!("cache cleared in less than {} minutes", minutes)
    }
}
