//! List command implementation

use anyhow::{Result, bail};

use reposcan::ScanStatus;
use reposcan::config::Config;
use reposcan::server::ScanListResponse;

use super::http::ApiClient;

/// List recent scans known to a running server
pub fn list_command(config: &Config, status: Option<String>, limit: usize) -> Result<()> {
    let mut path = format!("/api/v1/scans?limit={}", limit);
    if let Some(filter) = status {
        let Some(status) = ScanStatus::parse(&filter) else {
            bail!(
                "Unknown status: {} (expected one of: pending, in_progress, completed, failed)",
                filter
            );
        };
        path.push_str(&format!("&status={}", status));
    }

    let client = ApiClient::from_settings(&config.settings.http);
    let response: ScanListResponse = client.get(&path)?;

    if response.scans.is_empty() {
        println!("No scans found.");
        return Ok(());
    }

    println!("Scans ({}):\n", response.scans.len());
    for scan in &response.scans {
        let findings = scan
            .results
            .as_ref()
            .map(|r| format!("{} finding(s)", r.vulnerabilities.len()))
            .unwrap_or_default();
        println!(
            "  {} [{}] {} {}",
            scan.scan_id, scan.status, scan.repo_url, findings
        );
        if let Some(err) = &scan.error {
            println!("    Error: {}", err);
        }
    }

    Ok(())
}
