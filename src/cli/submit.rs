//! Submit command implementation

use std::time::{Duration, Instant};

use anyhow::{Result, bail};

use reposcan::config::Config;
use reposcan::server::{ScanRequest, ScanResultResponse, SubmitResponse};

use super::http::ApiClient;
use super::status::print_scan;

const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Submit a scan to a running server, optionally polling until it finishes
pub async fn submit_command(config: &Config, repo_url: &str, wait: bool, json: bool) -> Result<()> {
    let client = ApiClient::from_settings(&config.settings.http);
    let request = ScanRequest {
        repo_url: repo_url.to_string(),
    };
    let submitted: SubmitResponse = client.post("/api/v1/scan/", &request)?;

    if !wait {
        if json {
            println!("{}", serde_json::to_string_pretty(&submitted)?);
        } else {
            println!("{} ({})", submitted.message, submitted.status);
            println!("Scan ID: {}", submitted.scan_id);
        }
        return Ok(());
    }

    eprintln!("Scan {} submitted, waiting for it to finish...", submitted.scan_id);

    // Clone plus every analyzer may each take up to the scan timeout
    let deadline = Instant::now()
        + Duration::from_secs(config.settings.scan_timeout_seconds.saturating_mul(3).max(60));
    let path = format!("/api/v1/results/{}/", submitted.scan_id);

    loop {
        let scan: ScanResultResponse = client.get(&path)?;
        if scan.status.is_terminal() {
            return print_scan(&scan, json);
        }
        if Instant::now() >= deadline {
            bail!(
                "Scan {} still {} after waiting; check later with `reposcan status {}`",
                scan.scan_id,
                scan.status,
                scan.scan_id
            );
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}
