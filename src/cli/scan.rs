//! Scan command implementation: run one scan in this process

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use tracing::warn;

use reposcan::ScanStatus;
use reposcan::config::Config;
use reposcan::orchestrator::ScanOrchestrator;
use reposcan::registry::SqliteRegistry;
use reposcan::server::{ScanResultResponse, validate_repo_url};

use super::status::print_scan;

/// Clone and scan `target` (remote URL or local git checkout), then print the result
pub async fn scan_command(config: &Config, target: &str, json: bool) -> Result<()> {
    let source = resolve_source(target)?;

    let registry = SqliteRegistry::open(&config.settings.database_path)?;
    let orchestrator = Arc::new(ScanOrchestrator::from_config(config, Arc::new(registry))?);

    if orchestrator.analyzers().is_empty() {
        bail!("No analyzers enabled; check the [tools] section of your config");
    }
    for analyzer in orchestrator.analyzers().iter() {
        if !analyzer.is_available() {
            warn!(
                "[reposcan:cli] {} not found, its results will be missing",
                analyzer.name()
            );
        }
    }

    let job = orchestrator.submit(&source)?;
    if !json {
        eprintln!("Scanning {} (scan {})...", source, job.scan_id);
    }

    let job = orchestrator.wait(&job.scan_id).await?;
    let failed = job.status == ScanStatus::Failed;
    print_scan(&ScanResultResponse::from(job), json)?;

    if failed {
        bail!("Scan failed");
    }
    Ok(())
}

/// Local directories are passed to git as absolute paths; anything else must
/// be a remote repository URL.
fn resolve_source(target: &str) -> Result<String> {
    let path = Path::new(target);
    if path.is_dir() {
        let path = path
            .canonicalize()
            .with_context(|| format!("Failed to resolve {}", path.display()))?;
        return Ok(path.display().to_string());
    }

    validate_repo_url(target).map_err(|e| anyhow!(e))?;
    Ok(target.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_directory_becomes_absolute() {
        let dir = tempfile::TempDir::new().unwrap();
        let resolved = resolve_source(&dir.path().display().to_string()).unwrap();
        assert!(Path::new(&resolved).is_absolute());
    }

    #[test]
    fn remote_url_is_validated() {
        assert!(resolve_source("https://github.com/org/repo.git").is_ok());
        assert!(resolve_source("/definitely/not/a/dir").is_err());
    }
}
