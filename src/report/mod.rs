//! Diagnostics report model
//!
//! A report is a list of titled sections, each a list of rows comparing an
//! actual value against what is expected.

pub mod builder;
pub mod display;

use serde::Serialize;
use std::time::Duration;

use crate::actions::ClearAction;
use crate::output::formatters::format_cache_expiry;
use crate::probe::ProbeResult;

pub use builder::{ReportContext, build_report};

/// Full diagnostics report
#[derive(Debug, Clone, Default, Serialize)]
pub struct Report {
    pub sections: Vec<Section>,
}

impl Report {
    /// Rows across all sections
    pub fn rows(&self) -> impl Iterator<Item = (&Section, &ReportRow)> {
        self.sections
            .iter()
            .flat_map(|s| s.rows.iter().map(move |r| (s, r)))
    }

    pub fn failure_count(&self) -> usize {
        self.rows()
            .filter(|(_, r)| r.status == RowStatus::Fail)
            .count()
    }

    #[cfg(test)]
    pub fn find(&self, label: &str) -> Option<&ReportRow> {
        self.rows().map(|(_, r)| r).find(|r| r.label == label)
    }
}

/// A titled group of rows
#[derive(Debug, Clone, Serialize)]
pub struct Section {
    pub title: String,
    pub rows: Vec<ReportRow>,
}

impl Section {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: ReportRow) {
        self.rows.push(row);
    }
}

/// Outcome of a row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RowStatus {
    Pass,
    Fail,
    Info,
}

impl RowStatus {
    pub fn symbol(&self) -> &'static str {
        match self {
            RowStatus::Pass => "✓",
            RowStatus::Fail => "✗",
            RowStatus::Info => "○",
        }
    }
}

/// How to clear the cached result behind a row
#[derive(Debug, Clone, Serialize)]
pub struct CacheHint {
    pub action: &'static str,
    pub command: String,
    pub expires_in_minutes: u64,
}

impl CacheHint {
    pub fn new(action: &ClearAction, remaining: Duration) -> Self {
        Self {
            action: action.action_name(),
            command: action.command_hint(),
            expires_in_minutes: remaining.as_secs().div_ceil(60),
        }
    }

    pub fn describe(&self) -> String {
        format!(
            "clear: {} ({})",
            self.command,
            format_cache_expiry(self.expires_in_minutes)
        )
    }
}

/// One line of the report
#[derive(Debug, Clone, Serialize)]
pub struct ReportRow {
    pub label: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    pub status: RowStatus,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub more_info: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheHint>,
}

impl ReportRow {
    /// A value shown for reference only
    pub fn info(label: impl Into<String>, value: impl ToString) -> Self {
        Self {
            label: label.into(),
            value: value.to_string(),
            expected: None,
            status: RowStatus::Info,
            more_info: String::new(),
            cache: None,
        }
    }

    /// A value judged by a predicate computed by the caller
    pub fn check(label: impl Into<String>, value: impl ToString, is_error: bool) -> Self {
        Self {
            status: if is_error {
                RowStatus::Fail
            } else {
                RowStatus::Pass
            },
            ..Self::info(label, value)
        }
    }

    /// A value that must equal `expected`
    pub fn compare(label: impl Into<String>, value: impl ToString, expected: impl ToString) -> Self {
        let value = value.to_string();
        let expected = expected.to_string();
        Self {
            status: if value == expected {
                RowStatus::Pass
            } else {
                RowStatus::Fail
            },
            expected: Some(expected),
            ..Self::info(label, value)
        }
    }

    /// Row for a probe whose healthy outcome is [`ProbeResult::Ok`]
    pub fn from_probe(label: impl Into<String>, result: &ProbeResult) -> Self {
        let row = Self::compare(label, !result.is_ok(), false);
        match result.detail() {
            Some(detail) => row.with_info(detail),
            None => row,
        }
    }

    pub fn with_info(mut self, info: impl Into<String>) -> Self {
        self.more_info = info.into();
        self
    }

    pub fn with_cache(mut self, hint: CacheHint) -> Self {
        self.cache = Some(hint);
        self
    }

    /// Extra info plus the cache hint, as displayed
    pub fn details(&self) -> String {
        match (&self.cache, self.more_info.is_empty()) {
            (Some(hint), true) => hint.describe(),
            (Some(hint), false) => format!("{} {}", self.more_info, hint.describe()),
            (None, _) => self.more_info.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_status() {
        assert_eq!(ReportRow::compare("x", "InnoDB", "InnoDB").status, RowStatus::Pass);
        assert_eq!(ReportRow::compare("x", "MyISAM", "InnoDB").status, RowStatus::Fail);
        assert_eq!(ReportRow::compare("x", true, false).status, RowStatus::Fail);
    }

    #[test]
    fn test_check_status() {
        assert_eq!(ReportRow::check("x", "/srv", false).status, RowStatus::Pass);
        assert_eq!(ReportRow::check("x", "srv", true).status, RowStatus::Fail);
        assert_eq!(ReportRow::info("x", 42).status, RowStatus::Info);
    }

    #[test]
    fn test_from_probe() {
        let ok = ReportRow::from_probe("Requests blocked", &ProbeResult::Ok);
        assert_eq!(ok.value, "false");
        assert_eq!(ok.status, RowStatus::Pass);
        assert!(ok.more_info.is_empty());

        let bad = ReportRow::from_probe(
            "Requests blocked",
            &ProbeResult::Problem("Blocked internally.".to_string()),
        );
        assert_eq!(bad.value, "true");
        assert_eq!(bad.status, RowStatus::Fail);
        assert_eq!(bad.more_info, "Blocked internally.");
    }

    #[test]
    fn test_details_with_cache_hint() {
        let action = ClearAction::OrphanFiles {
            cache: "0a1b2c3d4e".to_string(),
        };
        let hint = CacheHint::new(&action, Duration::from_secs(60));
        let row = ReportRow::info("Orphan files count", 0).with_cache(hint);

        assert_eq!(
            row.details(),
            "clear: sitediag cache clear orphan-files --cache 0a1b2c3d4e \
             (cache cleared in less than 1 minute)"
        );
    }

    #[test]
    fn test_failure_count() {
        let mut section = Section::new("Tests");
        section.push(ReportRow::check("a", 1, true));
        section.push(ReportRow::check("b", 2, false));
        let report = Report {
            sections: vec![section],
        };

        assert_eq!(report.failure_count(), 1);
        assert!(report.find("b").is_some());
    }
}
