//! Per-tool field mapping tables

use std::collections::HashMap;

use crate::Severity;

/// Translates a tool's native severity label
pub type SeverityMap = fn(&str) -> Severity;

/// Where each normalized field lives in a tool's native finding.
///
/// Field locations are JSON pointers (RFC 6901) into one raw finding.
#[derive(Debug, Clone)]
pub struct FieldMapping {
    pub severity: String,
    pub file_path: String,
    pub line: String,
    pub description: String,
    pub code: String,
    pub severity_map: SeverityMap,
}

/// Mapping entries keyed by tool name
pub type MappingTable = HashMap<String, FieldMapping>;

impl FieldMapping {
    /// Bandit `-f json` result items
    pub fn bandit() -> Self {
        Self {
            severity: "/issue_severity".to_string(),
            file_path: "/filename".to_string(),
            line: "/line_number".to_string(),
            description: "/issue_text".to_string(),
            code: "/code".to_string(),
            severity_map: bandit_severity,
        }
    }

    /// Semgrep `--json` result items
    pub fn semgrep() -> Self {
        Self {
            severity: "/extra/severity".to_string(),
            file_path: "/path".to_string(),
            line: "/start/line".to_string(),
            description: "/extra/message".to_string(),
            code: "/extra/lines".to_string(),
            severity_map: semgrep_severity,
        }
    }
}

pub fn bandit_severity(label: &str) -> Severity {
    match label.trim().to_ascii_uppercase().as_str() {
        "LOW" => Severity::Low,
        "MEDIUM" => Severity::Medium,
        "HIGH" => Severity::High,
        _ => Severity::Unknown,
    }
}

pub fn semgrep_severity(label: &str) -> Severity {
    match label.trim().to_ascii_uppercase().as_str() {
        "INFO" | "LOW" => Severity::Low,
        "WARNING" | "MEDIUM" => Severity::Medium,
        "ERROR" | "HIGH" => Severity::High,
        "CRITICAL" => Severity::Critical,
        _ => Severity::Unknown,
    }
}
