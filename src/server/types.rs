//! Request and response bodies of the HTTP API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ScanJob, ScanReport, ScanStatus, ToolRun};

/// `POST /api/v1/scan/` body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRequest {
    pub repo_url: String,
}

/// `POST /api/v1/scan/` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub scan_id: String,
    pub status: ScanStatus,
    pub message: String,
}

/// `GET /api/v1/results/{scan_id}/` response.
///
/// `results` is only filled for completed scans and `error` only for failed
/// ones; both keys are always present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResultResponse {
    pub scan_id: String,
    pub repo_url: String,
    pub status: ScanStatus,
    pub results: Option<ScanReport>,
    pub error: Option<String>,
    #[serde(default)]
    pub tool_runs: Vec<ToolRun>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<ScanJob> for ScanResultResponse {
    fn from(job: ScanJob) -> Self {
        let results = job
            .result
            .filter(|_| job.status == ScanStatus::Completed);
        let error = job.error.filter(|_| job.status == ScanStatus::Failed);

        Self {
            scan_id: job.scan_id,
            repo_url: job.repo_url,
            status: job.status,
            results,
            error,
            tool_runs: job.tool_runs,
            created_at: job.created_at,
            started_at: job.started_at,
            completed_at: job.completed_at,
        }
    }
}

/// `GET /api/v1/scans` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanListResponse {
    pub scans: Vec<ScanResultResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Body of every non-2xx response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}
