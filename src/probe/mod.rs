//! Probe outcomes and the caching probe runner

pub mod runner;

use serde::{Deserialize, Serialize};

pub use runner::ProbeRunner;

/// Normalized outcome of a diagnostic probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum ProbeResult {
    /// Nothing wrong
    Ok,
    /// The check ran and found something worth reporting
    Problem(String),
    /// The check itself failed
    Error(String),
}

impl ProbeResult {
    /// Build a result from a list of findings; no findings means `Ok`.
    pub fn from_findings(findings: Vec<String>) -> Self {
        let findings: Vec<String> = findings
            .into_iter()
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty())
            .collect();

        if findings.is_empty() {
            ProbeResult::Ok
        } else {
            ProbeResult::Problem(findings.join(" "))
        }
    }

    /// Map blank details to `Ok` so "nothing wrong" has one representation.
    pub fn normalized(self) -> Self {
        match self {
            ProbeResult::Problem(detail) if detail.trim().is_empty() => ProbeResult::Ok,
            ProbeResult::Error(detail) if detail.trim().is_empty() => {
                ProbeResult::Error("Unknown error".to_string())
            }
            other => other,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, ProbeResult::Ok)
    }

    /// Problem or error text, if any
    pub fn detail(&self) -> Option<&str> {
        match self {
            ProbeResult::Ok => None,
            ProbeResult::Problem(detail) | ProbeResult::Error(detail) => Some(detail),
        }
    }
}
