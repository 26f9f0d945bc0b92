//! Request handlers for the scan API

use serde::Serialize;
use tracing::{error, info};

use super::types::{
    ErrorResponse, HealthResponse, ScanListResponse, ScanRequest, ScanResultResponse,
    SubmitResponse,
};
use super::{ApiState, respond_json};
use crate::ScanStatus;
use crate::orchestrator::OrchestratorError;
use crate::registry::RegistryError;

const DEFAULT_LIST_LIMIT: usize = 50;
const MAX_LIST_LIMIT: usize = 500;

/// Schemes accepted for remote repositories
const ALLOWED_SCHEMES: [&str; 4] = ["http", "https", "ssh", "git"];

/// Check that `raw` names a remote git repository.
///
/// Accepts http(s), ssh and git URLs with a host, plus scp-like
/// `user@host:path` references.
pub fn validate_repo_url(raw: &str) -> Result<(), String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err("repo_url is required".to_string());
    }
    if raw.starts_with('-') {
        return Err("repo_url must not start with '-'".to_string());
    }

    match url::Url::parse(raw) {
        Ok(url) => {
            if !ALLOWED_SCHEMES.contains(&url.scheme()) {
                return Err(format!("unsupported URL scheme '{}'", url.scheme()));
            }
            if url.host_str().is_none_or(str::is_empty) {
                return Err("repository URL has no host".to_string());
            }
            Ok(())
        }
        Err(_) if is_scp_like(raw) => Ok(()),
        Err(e) => Err(format!("invalid repository URL: {}", e)),
    }
}

/// `git@github.com:org/repo.git`
fn is_scp_like(raw: &str) -> bool {
    let Some((user_host, path)) = raw.split_once(':') else {
        return false;
    };
    let Some((user, host)) = user_host.split_once('@') else {
        return false;
    };
    !user.is_empty()
        && !host.is_empty()
        && !user_host.contains('/')
        && !path.is_empty()
        && !path.starts_with("//")
}

pub(super) fn handle_submit(state: &ApiState, body: &str, request: tiny_http::Request) {
    let scan_request: ScanRequest = match serde_json::from_str(body) {
        Ok(req) => req,
        Err(e) => {
            respond_error(request, 400, "invalid_request", Some(e.to_string()));
            return;
        }
    };

    if let Err(detail) = validate_repo_url(&scan_request.repo_url) {
        respond_error(request, 400, "invalid_repo_url", Some(detail));
        return;
    }

    match state.orchestrator.submit(&scan_request.repo_url) {
        Ok(job) => {
            info!(
                "[reposcan:http] Accepted scan {} for {}",
                job.scan_id, job.repo_url
            );
            respond_with(
                request,
                200,
                &SubmitResponse {
                    scan_id: job.scan_id,
                    status: job.status,
                    message: "Scan initiated successfully".to_string(),
                },
            );
        }
        Err(OrchestratorError::InvalidSource(detail)) => {
            respond_error(request, 400, "invalid_repo_url", Some(detail));
        }
        Err(e) => {
            error!("[reposcan:http] Failed to submit scan: {}", e);
            respond_error(request, 500, "submit_failed", Some(e.to_string()));
        }
    }
}

pub(super) fn handle_result(state: &ApiState, path: &str, request: tiny_http::Request) {
    let scan_id = path
        .trim_start_matches("/api/v1/results/")
        .trim_end_matches('/');
    if scan_id.is_empty() || scan_id.contains('/') {
        respond_json(request, 404, serde_json::json!({ "error": "not_found" }));
        return;
    }

    match state.orchestrator.get(scan_id) {
        Ok(job) => respond_with(request, 200, &ScanResultResponse::from(job)),
        Err(RegistryError::NotFound(_)) => {
            respond_error(request, 404, "not_found", Some("Scan not found".to_string()));
        }
        Err(e) => {
            error!("[reposcan:http] Failed to load scan {}: {}", scan_id, e);
            respond_error(request, 500, "registry", Some(e.to_string()));
        }
    }
}

pub(super) fn handle_list(state: &ApiState, query: &str, request: tiny_http::Request) {
    let mut status = None;
    let mut limit = DEFAULT_LIST_LIMIT;

    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        match key.as_ref() {
            "status" if !value.is_empty() => match ScanStatus::parse(&value) {
                Some(s) => status = Some(s),
                None => {
                    respond_error(
                        request,
                        400,
                        "invalid_status",
                        Some(format!("unknown status '{}'", value)),
                    );
                    return;
                }
            },
            "limit" => match value.parse::<usize>() {
                Ok(n) => limit = n.min(MAX_LIST_LIMIT),
                Err(_) => {
                    respond_error(
                        request,
                        400,
                        "invalid_limit",
                        Some(format!("limit must be a number, got '{}'", value)),
                    );
                    return;
                }
            },
            _ => {}
        }
    }

    match state.orchestrator.list(status, Some(limit)) {
        Ok(jobs) => respond_with(
            request,
            200,
            &ScanListResponse {
                scans: jobs.into_iter().map(ScanResultResponse::from).collect(),
            },
        ),
        Err(e) => {
            error!("[reposcan:http] Failed to list scans: {}", e);
            respond_error(request, 500, "registry", Some(e.to_string()));
        }
    }
}

pub(super) fn handle_health(request: tiny_http::Request) {
    respond_with(
        request,
        200,
        &HealthResponse {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
    );
}

fn respond_with<T: Serialize>(request: tiny_http::Request, status_code: u16, body: &T) {
    match serde_json::to_value(body) {
        Ok(value) => respond_json(request, status_code, value),
        Err(e) => respond_error(request, 500, "serialize", Some(e.to_string())),
    }
}

fn respond_error(
    request: tiny_http::Request,
    status_code: u16,
    error: &str,
    detail: Option<String>,
) {
    let body = ErrorResponse {
        error: error.to_string(),
        detail,
    };
    let value = serde_json::to_value(&body)
        .unwrap_or_else(|_| serde_json::json!({ "error": body.error }));
    respond_json(request, status_code, value);
}
