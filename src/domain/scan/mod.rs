mod impls;
mod status;

pub use status::ScanStatus;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ScanReport, ToolRun};

/// Unique identifier for a scan (UUID v4 string)
pub type ScanId = String;

/// A scan request tracked from submission to its terminal status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanJob {
    /// Unique identifier, generated at submission
    pub scan_id: ScanId,

    /// Repository reference to clone (URL or path understood by git)
    pub repo_url: String,

    /// Current lifecycle status
    pub status: ScanStatus,

    /// When the scan was submitted
    pub created_at: DateTime<Utc>,

    /// When the pipeline picked the scan up
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,

    /// When the scan reached completed/failed
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,

    /// Merged report, only present once completed
    #[serde(default)]
    pub result: Option<ScanReport>,

    /// Failure description, only present once failed
    #[serde(default)]
    pub error: Option<String>,

    /// Per-analyzer execution summaries
    #[serde(default)]
    pub tool_runs: Vec<ToolRun>,
}

/// A status change applied to a stored scan.
///
/// Each variant carries exactly the payload its target status requires, so a
/// terminal payload can never be written without its status (or vice versa).
#[derive(Debug, Clone)]
pub enum ScanUpdate {
    Started {
        at: DateTime<Utc>,
    },
    Completed {
        report: ScanReport,
        tool_runs: Vec<ToolRun>,
        at: DateTime<Utc>,
    },
    Failed {
        error: String,
        tool_runs: Vec<ToolRun>,
        at: DateTime<Utc>,
    },
}

impl ScanUpdate {
    pub fn started() -> Self {
        ScanUpdate::Started { at: Utc::now() }
    }

    pub fn completed(report: ScanReport, tool_runs: Vec<ToolRun>) -> Self {
        ScanUpdate::Completed {
            report,
            tool_runs,
            at: Utc::now(),
        }
    }

    pub fn failed(error: impl Into<String>, tool_runs: Vec<ToolRun>) -> Self {
        ScanUpdate::Failed {
            error: error.into(),
            tool_runs,
            at: Utc::now(),
        }
    }

    /// The status a scan ends up in after this update
    pub fn target_status(&self) -> ScanStatus {
        match self {
            ScanUpdate::Started { .. } => ScanStatus::InProgress,
            ScanUpdate::Completed { .. } => ScanStatus::Completed,
            ScanUpdate::Failed { .. } => ScanStatus::Failed,
        }
    }
}

/// Rejected lifecycle transition
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("illegal scan transition {from} -> {to}")]
pub struct TransitionError {
    pub from: ScanStatus,
    pub to: ScanStatus,
}
