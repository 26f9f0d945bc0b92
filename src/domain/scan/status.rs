use serde::{Deserialize, Serialize};

/// The lifecycle status of a scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    /// Scan was accepted and is waiting to start
    Pending,
    /// Workspace and analyzers are running
    InProgress,
    /// Scan finished and the merged report is attached
    Completed,
    /// Scan failed, the error message is attached
    Failed,
}

impl ScanStatus {
    pub const ALL: [ScanStatus; 4] = [
        ScanStatus::Pending,
        ScanStatus::InProgress,
        ScanStatus::Completed,
        ScanStatus::Failed,
    ];

    /// Get the string used in storage and the HTTP API
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanStatus::Pending => "pending",
            ScanStatus::InProgress => "in_progress",
            ScanStatus::Completed => "completed",
            ScanStatus::Failed => "failed",
        }
    }

    /// Parse a status string (case-insensitive, accepts `in-progress` too)
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().replace('-', "_").as_str() {
            "pending" => Some(ScanStatus::Pending),
            "in_progress" | "running" => Some(ScanStatus::InProgress),
            "completed" | "done" => Some(ScanStatus::Completed),
            "failed" => Some(ScanStatus::Failed),
            _ => None,
        }
    }

    /// Completed and failed scans never change again
    pub fn is_terminal(&self) -> bool {
        matches!(self, ScanStatus::Completed | ScanStatus::Failed)
    }

    /// Whether `self -> next` is a legal lifecycle transition.
    ///
    /// `pending -> in_progress -> {completed | failed}` is the only path.
    pub fn can_transition_to(&self, next: ScanStatus) -> bool {
        matches!(
            (self, next),
            (ScanStatus::Pending, ScanStatus::InProgress)
                | (ScanStatus::InProgress, ScanStatus::Completed)
                | (ScanStatus::InProgress, ScanStatus::Failed)
        )
    }
}

impl std::fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
