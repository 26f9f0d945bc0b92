use serde::{Deserialize, Serialize};

use super::ScanId;

/// Normalized severity shared by every analyzer
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Unknown,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Unknown => "unknown",
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A tool-agnostic finding in the merged report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vulnerability {
    /// Name of the analyzer that reported it (e.g., "bandit")
    pub tool: String,

    pub severity: Severity,

    /// Path relative to the repository root, `/`-separated
    pub file_path: String,

    /// 1-based line, 0 when the finding is not line-addressable
    pub line_number: u64,

    pub description: String,

    /// Offending source excerpt, if the tool provided one
    pub code: Option<String>,
}

/// The merged, normalized result of one scan.
///
/// This is also the layout of the persisted `<scan_id>.json` result file, so
/// field names must stay stable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanReport {
    pub scan_id: ScanId,
    pub repo_url: String,
    pub vulnerabilities: Vec<Vulnerability>,
}

impl ScanReport {
    /// Count findings per severity, highest first
    pub fn severity_counts(&self) -> Vec<(Severity, usize)> {
        let mut counts = std::collections::BTreeMap::new();
        for vuln in &self.vulnerabilities {
            *counts.entry(vuln.severity).or_insert(0usize) += 1;
        }
        counts.into_iter().rev().collect()
    }
}
