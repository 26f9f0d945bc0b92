use serde::{Deserialize, Serialize};

/// How a single analyzer invocation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolRunStatus {
    /// Tool ran and its output was parsed (possibly with zero findings)
    Succeeded,
    /// Tool could not be started, crashed, or produced unusable output
    Failed,
    /// Tool exceeded the scan timeout and was killed
    TimedOut,
}

/// Execution summary for one analyzer within a scan.
///
/// Lets consumers tell "tool found nothing" apart from "tool did not run".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolRun {
    pub tool: String,
    pub status: ToolRunStatus,
    /// Number of raw findings the tool contributed
    pub findings: usize,
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl ToolRun {
    pub fn succeeded(tool: impl Into<String>, findings: usize, duration_ms: u64) -> Self {
        Self {
            tool: tool.into(),
            status: ToolRunStatus::Succeeded,
            findings,
            error: None,
            duration_ms,
        }
    }

    pub fn failed(tool: impl Into<String>, error: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            tool: tool.into(),
            status: ToolRunStatus::Failed,
            findings: 0,
            error: Some(error.into()),
            duration_ms,
        }
    }

    pub fn timed_out(tool: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            tool: tool.into(),
            status: ToolRunStatus::TimedOut,
            findings: 0,
            error: Some(format!("timed out after {}ms", duration_ms)),
            duration_ms,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ToolRunStatus::Succeeded
    }
}
