//! Report rendering for table, JSON and pretty output

use colored::Colorize;
use serde::Serialize;
use tabled::Tabled;

use crate::cli::OutputFormat;
use crate::error::Result;
use crate::output::Formattable;
use crate::output::json::format_json;
use crate::output::table::format_table;
use crate::report::{Report, ReportRow, RowStatus, Section};

/// One report row flattened for table output
#[derive(Debug, Clone, Tabled, Serialize)]
pub struct RowDisplay {
    #[tabled(rename = "SECTION")]
    pub section: String,

    #[tabled(rename = "CHECK")]
    pub check: String,

    #[tabled(rename = "VALUE")]
    pub value: String,

    #[tabled(rename = "EXPECTED")]
    pub expected: String,

    #[tabled(rename = "STATUS")]
    pub status: String,

    #[tabled(rename = "INFO")]
    pub info: String,
}

impl From<(&Section, &ReportRow)> for RowDisplay {
    fn from((section, row): (&Section, &ReportRow)) -> Self {
        Self {
            section: section.title.clone(),
            check: row.label.clone(),
            value: display_value(&row.value),
            expected: row.expected.clone().unwrap_or_default(),
            status: row.status.symbol().to_string(),
            info: row.details(),
        }
    }
}

/// Values are never rendered blank
fn display_value(value: &str) -> String {
    if value.is_empty() {
        "(empty)".to_string()
    } else {
        value.to_string()
    }
}

fn colored_symbol(status: RowStatus) -> String {
    match status {
        RowStatus::Pass => status.symbol().green().to_string(),
        RowStatus::Fail => status.symbol().red().to_string(),
        RowStatus::Info => status.symbol().dimmed().to_string(),
    }
}

/// Human-oriented rendering: one block per section
pub fn format_pretty(report: &Report) -> String {
    let mut out = String::new();

    for section in &report.sections {
        out.push_str(&format!("{}\n", section.title.bold()));
        out.push_str("────────────────────────────────────────\n");

        for row in &section.rows {
            let value = display_value(&row.value);
            let line = match &row.expected {
                Some(expected) if row.status == RowStatus::Fail => format!(
                    "{} {}: {} (expected {})",
                    colored_symbol(row.status),
                    row.label,
                    value.red(),
                    expected
                ),
                _ => format!("{} {}: {}", colored_symbol(row.status), row.label, value),
            };
            out.push_str(&line);
            out.push('\n');

            let details = row.details();
            if !details.is_empty() {
                out.push_str(&format!("  → {}\n", details.dimmed()));
            }
        }
        out.push('\n');
    }

    let failures = report.failure_count();
    if failures == 0 {
        out.push_str(&format!("{}", "All checks passed.".green()));
    } else {
        let noun = if failures == 1 { "check" } else { "checks" };
        out.push_str(&format!("{}", format!("{} {} failed.", failures, noun).red()));
    }

    out
}

impl Formattable for Report {
    fn format(&self, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Json => Ok(format_json(self)?),
            OutputFormat::Table => {
                let rows: Vec<RowDisplay> = self.rows().map(RowDisplay::from).collect();
                Ok(format_table(&rows))
            }
            OutputFormat::Pretty => Ok(format_pretty(self)),
        }
    }
}
