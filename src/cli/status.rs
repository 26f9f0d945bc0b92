//! Status command implementation

use anyhow::Result;

use reposcan::server::ScanResultResponse;
use reposcan::{ScanStatus, Severity};

use super::http::ApiClient;
use reposcan::config::Config;

/// Show one scan fetched from a running server
pub fn status_command(config: &Config, scan_id: &str, json: bool) -> Result<()> {
    let client = ApiClient::from_settings(&config.settings.http);
    let scan: ScanResultResponse = client.get(&format!("/api/v1/results/{}/", scan_id))?;
    print_scan(&scan, json)
}

/// Print a scan either as JSON or as a human-readable summary
pub fn print_scan(scan: &ScanResultResponse, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(scan)?);
        return Ok(());
    }

    println!("Scan {} [{}]", scan.scan_id, scan.status);
    println!("  Repository: {}", scan.repo_url);
    println!("  Submitted:  {}", scan.created_at.format("%Y-%m-%d %H:%M:%S UTC"));
    if let Some(completed) = scan.completed_at {
        println!("  Finished:   {}", completed.format("%Y-%m-%d %H:%M:%S UTC"));
    }

    for run in &scan.tool_runs {
        match &run.error {
            Some(err) => println!("  {:<8} {:?}: {}", run.tool, run.status, err),
            None => println!(
                "  {:<8} {} finding(s) in {}ms",
                run.tool, run.findings, run.duration_ms
            ),
        }
    }

    if let Some(err) = &scan.error {
        println!("\n  Error: {}", err);
    }

    if let Some(report) = &scan.results {
        if report.vulnerabilities.is_empty() {
            println!("\nNo vulnerabilities found.");
            return Ok(());
        }

        let counts: Vec<String> = report
            .severity_counts()
            .into_iter()
            .map(|(severity, n)| format!("{} {}", n, severity))
            .collect();
        println!(
            "\nVulnerabilities ({}): {}\n",
            report.vulnerabilities.len(),
            counts.join(", ")
        );

        for vuln in &report.vulnerabilities {
            println!(
                "  [{}] {} {}:{}",
                severity_label(vuln.severity),
                vuln.tool,
                vuln.file_path,
                vuln.line_number
            );
            if !vuln.description.is_empty() {
                println!("      {}", vuln.description);
            }
        }
    } else if scan.status == ScanStatus::Pending || scan.status == ScanStatus::InProgress {
        println!("\nScan is still running.");
    }

    Ok(())
}

fn severity_label(severity: Severity) -> String {
    format!("{:<8}", severity.as_str().to_uppercase())
}
