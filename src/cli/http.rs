//! HTTP client for talking to a running `reposcan serve`

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;

use reposcan::config::HttpSettings;
use reposcan::server::AUTH_HEADER;

fn format_http_error(code: u16, body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        return format!("HTTP {code}");
    }

    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return format!("HTTP {code}: {body}");
    };

    let error = value
        .get("error")
        .and_then(|v| v.as_str())
        .unwrap_or("http_error");
    match value.get("detail").and_then(|v| v.as_str()) {
        Some(detail) => format!("HTTP {code} {error}: {detail}"),
        None => format!("HTTP {code} {error}"),
    }
}

fn map_call_error(e: ureq::Error) -> anyhow::Error {
    match e {
        ureq::Error::Status(code, resp) => {
            let body = resp.into_string().unwrap_or_default();
            anyhow::anyhow!(format_http_error(code, &body))
        }
        other => anyhow::Error::new(other).context("Is `reposcan serve` running?"),
    }
}

/// Client for the scan API
pub struct ApiClient {
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    /// Client for the server described by the local configuration
    pub fn from_settings(http: &HttpSettings) -> Self {
        // A wildcard bind is reachable through loopback
        let host = match http.bind.as_str() {
            "0.0.0.0" | "::" | "[::]" => "127.0.0.1",
            other => other,
        };
        Self {
            base_url: format!("http://{}:{}", host, http.port),
            token: http.auth_token().map(str::to_string),
        }
    }

    fn with_auth(&self, mut req: ureq::Request) -> ureq::Request {
        if let Some(token) = &self.token {
            req = req.set(AUTH_HEADER, token);
        }
        req
    }

    pub fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .with_auth(ureq::get(&url))
            .call()
            .map_err(map_call_error)?;

        let body = resp.into_string().context("Failed to read response body")?;
        serde_json::from_str(&body).context("Failed to parse JSON response")
    }

    pub fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, payload: &B) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let body = serde_json::to_string(payload).context("Failed to serialize request JSON")?;
        let resp = self
            .with_auth(ureq::post(&url))
            .set("Content-Type", "application/json")
            .send_string(&body)
            .map_err(map_call_error)?;

        let body = resp.into_string().context("Failed to read response body")?;
        serde_json::from_str(&body).context("Failed to parse JSON response")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_bodies_are_summarized() {
        assert_eq!(format_http_error(502, ""), "HTTP 502");
        assert_eq!(format_http_error(500, "oops"), "HTTP 500: oops");
        assert_eq!(
            format_http_error(404, r#"{"error":"not_found","detail":"Scan not found"}"#),
            "HTTP 404 not_found: Scan not found"
        );
    }

    #[test]
    fn wildcard_bind_uses_loopback() {
        let http = HttpSettings {
            bind: "0.0.0.0".to_string(),
            port: 8123,
            token: String::new(),
        };
        let client = ApiClient::from_settings(&http);
        assert_eq!(client.base_url, "http://127.0.0.1:8123");
        assert!(client.token.is_none());
    }
}
