//! JSON output formatting

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Wrapper for JSON output with metadata
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonOutput<T> {
    /// The actual data
    pub data: T,

    /// Metadata about the response
    pub meta: Metadata,
}

/// Metadata included in JSON output
#[derive(Debug, Serialize, Deserialize)]
pub struct Metadata {
    /// Timestamp of the response
    pub timestamp: String,

    /// CLI version
    pub version: String,
}

impl<T> JsonOutput<T> {
    /// Create a new JSON output with metadata
    pub fn new(data: T) -> Self {
        Self {
            data,
            meta: Metadata {
                timestamp: Utc::now().to_rfc3339(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        }
    }
}

/// Format data as pretty-printed JSON
pub fn format_json<T: Serialize + ?Sized>(data: &T) -> Result<String, serde_json::Error> {
    let output = JsonOutput::new(data);
    serde_json::to_string_pretty(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{ReportRow, Section};

    #[test]
    fn test_json_output_new() {
        let output = JsonOutput::new(vec!["sitediag_req_0123456789"]);

        assert_eq!(output.data, vec!["sitediag_req_0123456789"]);
        assert_eq!(output.meta.version, env!("CARGO_PKG_VERSION"));
        assert!(!output.meta.timestamp.is_empty());
    }

    #[test]
    fn test_format_json_section() {
        let mut section = Section::new("Attachments");
        section.push(ReportRow::compare("Files table is ready", true, true));

        let result = format_json(&section).unwrap();

        assert!(result.contains("\"data\""));
        assert!(result.contains("\"meta\""));
        assert!(result.contains("\"title\": \"Attachments\""));
        assert!(result.contains("\"status\": \"pass\""));
        assert!(result.contains("\"expected\": \"true\""));
        // Empty extra info is omitted
        assert!(!result.contains("more_info"));
    }

    #[test]
    fn test_format_json_empty_vec() {
        let rows: Vec<ReportRow> = vec![];
        let result = format_json(&rows).unwrap();

        assert!(result.contains("\"data\": []"));
    }
}
