//! HTTP API for submitting scans and polling their results
//!
//! Routes:
//! - `POST /api/v1/scan/` - submit `{"repo_url": "..."}`
//! - `GET /api/v1/results/{scan_id}/` - status and, once finished, result or error
//! - `GET /api/v1/scans?status=&limit=` - recent scans
//! - `GET /api/v1/health` - liveness probe

mod handlers;
mod types;

pub use handlers::validate_repo_url;
pub use types::{
    ErrorResponse, HealthResponse, ScanListResponse, ScanRequest, ScanResultResponse,
    SubmitResponse,
};

use std::io::Read;
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread;

use anyhow::{Result, anyhow};
use tiny_http::{Response, Server};
use tracing::{debug, error, info};

use crate::orchestrator::ScanOrchestrator;

pub const AUTH_HEADER: &str = "X-Reposcan-Token";
const MAX_BODY_BYTES: usize = 1024 * 1024; // 1 MiB

/// Shared state handed to every request handler
#[derive(Clone)]
pub struct ApiState {
    pub orchestrator: Arc<ScanOrchestrator>,
}

/// A bound, not yet serving, HTTP listener
pub struct HttpServer {
    server: Arc<Server>,
    state: ApiState,
    auth_token: Option<String>,
}

/// Handle to a server running on a background thread
pub struct ServerHandle {
    server: Arc<Server>,
    thread: thread::JoinHandle<()>,
}

impl HttpServer {
    /// Bind the listener (port 0 picks a free port)
    pub fn bind(addr: &str, state: ApiState, auth_token: Option<String>) -> Result<Self> {
        let server = Server::http(addr)
            .map_err(|e| anyhow!("Failed to start HTTP server on {}: {}", addr, e))?;
        let auth_token = auth_token.filter(|t| !t.trim().is_empty());

        info!(
            "[reposcan:http] Listening on http://{} (auth: {})",
            server
                .server_addr()
                .to_ip()
                .map(|a| a.to_string())
                .unwrap_or_else(|| addr.to_string()),
            if auth_token.is_some() {
                "enabled"
            } else {
                "disabled"
            }
        );

        Ok(Self {
            server: Arc::new(server),
            state,
            auth_token,
        })
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.server_addr().to_ip()
    }

    /// Serve requests on the current thread until the server is unblocked
    pub fn run(self) {
        serve(&self.server, &self.state, self.auth_token.as_deref());
    }

    /// Serve requests on a background thread
    pub fn spawn(self) -> ServerHandle {
        let server = Arc::clone(&self.server);
        let thread = thread::spawn(move || self.run());
        ServerHandle { server, thread }
    }
}

impl ServerHandle {
    /// Stop accepting requests and wait for the serving thread
    pub fn shutdown(self) {
        self.server.unblock();
        if self.thread.join().is_err() {
            error!("[reposcan:http] Server thread panicked");
        }
    }
}

fn serve(server: &Server, state: &ApiState, auth_token: Option<&str>) {
    for mut request in server.incoming_requests() {
        let method = request.method().to_string();
        let url = request.url().to_string();
        let (path, query) = match url.split_once('?') {
            Some((path, query)) => (path, query),
            None => (url.as_str(), ""),
        };
        debug!("[reposcan:http] {} {}", method, url);

        if !is_authorized(&request, auth_token) {
            respond_json(
                request,
                401,
                serde_json::json!({ "error": "unauthorized" }),
            );
            continue;
        }

        match (method.as_str(), path) {
            ("POST", "/api/v1/scan" | "/api/v1/scan/") => {
                let body = match read_request_body(&mut request) {
                    Ok(body) => body,
                    Err(response) => {
                        let _ = request.respond(response);
                        continue;
                    }
                };
                handlers::handle_submit(state, &body, request);
            }
            ("GET", "/api/v1/scans" | "/api/v1/scans/") => {
                handlers::handle_list(state, query, request);
            }
            ("GET", "/api/v1/health") => handlers::handle_health(request),
            ("GET", p) if p.starts_with("/api/v1/results/") => {
                handlers::handle_result(state, p, request);
            }
            _ => respond_json(request, 404, serde_json::json!({ "error": "not_found" })),
        }
    }
    debug!("[reposcan:http] Server loop stopped");
}

fn is_authorized(request: &tiny_http::Request, expected: Option<&str>) -> bool {
    let Some(expected) = expected else {
        return true;
    };

    request
        .headers()
        .iter()
        .find(|h| h.field.equiv(AUTH_HEADER))
        .is_some_and(|h| h.value.as_str() == expected)
}

fn json_content_type() -> tiny_http::Header {
    tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
        .expect("static header is valid")
}

fn read_request_body(
    request: &mut tiny_http::Request,
) -> Result<String, Response<std::io::Cursor<Vec<u8>>>> {
    let mut body = String::new();
    let mut reader = request.as_reader().take((MAX_BODY_BYTES + 1) as u64);
    if let Err(e) = reader.read_to_string(&mut body) {
        error!("[reposcan:http] Failed to read body: {}", e);
        let response = Response::from_string("{\"error\":\"bad_request\"}")
            .with_status_code(400)
            .with_header(json_content_type());
        return Err(response);
    }

    if body.len() > MAX_BODY_BYTES {
        let response = Response::from_string("{\"error\":\"payload_too_large\"}")
            .with_status_code(413)
            .with_header(json_content_type());
        return Err(response);
    }

    Ok(body)
}

fn respond_json(request: tiny_http::Request, status_code: u16, value: serde_json::Value) {
    let body =
        serde_json::to_string(&value).unwrap_or_else(|_| "{\"error\":\"serialize\"}".to_string());
    let response = Response::from_string(body)
        .with_status_code(status_code)
        .with_header(json_content_type());
    let _ = request.respond(response);
}
