use chrono::Utc;

use super::{ScanJob, ScanStatus, ScanUpdate, TransitionError};

impl ScanJob {
    /// Create a new pending scan with a fresh identifier
    pub fn new(repo_url: impl Into<String>) -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string(), repo_url)
    }

    /// Create a new pending scan with a caller-chosen identifier
    pub fn with_id(scan_id: impl Into<String>, repo_url: impl Into<String>) -> Self {
        Self {
            scan_id: scan_id.into(),
            repo_url: repo_url.into(),
            status: ScanStatus::Pending,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            result: None,
            error: None,
            tool_runs: Vec::new(),
        }
    }

    /// Apply a status update, rejecting anything but a forward transition.
    ///
    /// On success the status and its payload change together; on error the
    /// job is left untouched.
    pub fn apply(&mut self, update: ScanUpdate) -> Result<(), TransitionError> {
        let next = update.target_status();
        if !self.status.can_transition_to(next) {
            return Err(TransitionError {
                from: self.status,
                to: next,
            });
        }

        match update {
            ScanUpdate::Started { at } => {
                self.started_at = Some(at);
            }
            ScanUpdate::Completed {
                report,
                tool_runs,
                at,
            } => {
                self.result = Some(report);
                self.error = None;
                self.tool_runs = tool_runs;
                self.completed_at = Some(at);
            }
            ScanUpdate::Failed {
                error,
                tool_runs,
                at,
            } => {
                self.result = None;
                self.error = Some(error);
                self.tool_runs = tool_runs;
                self.completed_at = Some(at);
            }
        }
        self.status = next;
        Ok(())
    }
}
