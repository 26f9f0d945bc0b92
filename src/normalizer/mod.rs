//! Merges tool-native findings into the common [`Vulnerability`] shape.
//!
//! Normalization is pure: the same inputs always produce the same report,
//! down to the serialized bytes. Tools are looked up in a [`MappingTable`],
//! so supporting a new analyzer only needs a new [`FieldMapping`] entry.

mod mapping;

pub use mapping::{FieldMapping, MappingTable, SeverityMap, bandit_severity, semgrep_severity};

use std::path::{Component, Path};

use serde_json::Value;

use crate::analyzer::RawFinding;
use crate::{ScanReport, Vulnerability};

/// Path used when a finding does not name a file
pub const UNKNOWN_PATH: &str = "unknown";

/// The raw findings one analyzer contributed to a scan
#[derive(Debug, Clone)]
pub struct ToolFindings {
    pub tool: String,
    pub findings: Vec<RawFinding>,
}

impl ToolFindings {
    pub fn new(tool: impl Into<String>, findings: Vec<RawFinding>) -> Self {
        Self {
            tool: tool.into(),
            findings,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    #[error("no field mapping registered for tool '{0}'")]
    UnmappedTool(String),
}

/// Converts per-tool findings into a [`ScanReport`]
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    mappings: MappingTable,
}

impl Normalizer {
    pub fn new(mappings: MappingTable) -> Self {
        Self { mappings }
    }

    /// Normalizer knowing the built-in analyzers
    pub fn builtin() -> Self {
        let mut mappings = MappingTable::new();
        mappings.insert("bandit".to_string(), FieldMapping::bandit());
        mappings.insert("semgrep".to_string(), FieldMapping::semgrep());
        Self::new(mappings)
    }

    pub fn register(&mut self, tool: impl Into<String>, mapping: FieldMapping) {
        self.mappings.insert(tool.into(), mapping);
    }

    pub fn knows(&self, tool: &str) -> bool {
        self.mappings.contains_key(tool)
    }

    /// Merge all contributions into one report.
    ///
    /// Findings keep the order of `contributions`, then each tool's own order.
    /// Absolute paths under any of `workspace_roots` (the workspace path and
    /// its resolved form) are made relative to it. The filesystem is not read.
    pub fn normalize(
        &self,
        scan_id: &str,
        repo_url: &str,
        workspace_roots: &[&Path],
        contributions: &[ToolFindings],
    ) -> Result<ScanReport, NormalizeError> {
        let mut vulnerabilities = Vec::new();

        for contribution in contributions {
            let mapping = self
                .mappings
                .get(&contribution.tool)
                .ok_or_else(|| NormalizeError::UnmappedTool(contribution.tool.clone()))?;

            vulnerabilities.extend(contribution.findings.iter().map(|finding| {
                normalize_finding(&contribution.tool, mapping, workspace_roots, finding)
            }));
        }

        Ok(ScanReport {
            scan_id: scan_id.to_string(),
            repo_url: repo_url.to_string(),
            vulnerabilities,
        })
    }
}

fn normalize_finding(
    tool: &str,
    mapping: &FieldMapping,
    workspace_roots: &[&Path],
    finding: &RawFinding,
) -> Vulnerability {
    let severity = finding
        .pointer(&mapping.severity)
        .and_then(Value::as_str)
        .map(mapping.severity_map)
        .unwrap_or_default();

    let file_path = finding
        .pointer(&mapping.file_path)
        .and_then(Value::as_str)
        .map(|raw| relative_path(raw, workspace_roots))
        .filter(|path| !path.is_empty())
        .unwrap_or_else(|| UNKNOWN_PATH.to_string());

    let line_number = finding
        .pointer(&mapping.line)
        .map(line_value)
        .unwrap_or(0);

    let description = finding
        .pointer(&mapping.description)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let code = finding
        .pointer(&mapping.code)
        .and_then(Value::as_str)
        .filter(|code| !code.is_empty())
        .map(str::to_string);

    Vulnerability {
        tool: tool.to_string(),
        severity,
        file_path,
        line_number,
        description,
        code,
    }
}

/// Line numbers come as integers, occasionally as strings; anything else is 0
fn line_value(value: &Value) -> u64 {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

/// Strip the workspace prefix and render with `/` separators.
///
/// Absolute paths outside the workspace are kept as given.
fn relative_path(raw: &str, workspace_roots: &[&Path]) -> String {
    let path = Path::new(raw);
    let relative = if path.is_absolute() {
        match workspace_roots
            .iter()
            .find_map(|root| path.strip_prefix(root).ok())
        {
            Some(rest) => rest,
            None => return raw.to_string(),
        }
    } else {
        path
    };

    relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            Component::ParentDir => Some("..".to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
