//! Serve command implementation

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use reposcan::config::Config;
use reposcan::orchestrator::ScanOrchestrator;
use reposcan::registry::SqliteRegistry;
use reposcan::server::{ApiState, HttpServer};

/// Run the scan API until Ctrl-C, then let running scans finish
pub async fn serve_command(config: &Config, bind: Option<String>, port: Option<u16>) -> Result<()> {
    let mut http = config.settings.http.clone();
    if let Some(bind) = bind {
        http.bind = bind;
    }
    if let Some(port) = port {
        http.port = port;
    }

    let registry = SqliteRegistry::open(&config.settings.database_path)?;
    let orchestrator = Arc::new(ScanOrchestrator::from_config(config, Arc::new(registry))?);

    for analyzer in orchestrator.analyzers().iter() {
        if !analyzer.is_available() {
            warn!(
                "[reposcan:cli] {} not found on PATH; scans will record it as failed",
                analyzer.name()
            );
        }
    }

    let recovery = orchestrator.recover_interrupted()?;
    if recovery != Default::default() {
        info!(
            "[reposcan:cli] Recovery: {} resumed, {} marked failed, {} stale workspace(s) removed",
            recovery.resumed, recovery.failed, recovery.stale_workspaces
        );
    }

    let state = ApiState {
        orchestrator: Arc::clone(&orchestrator),
    };
    let server = HttpServer::bind(&http.bind_addr(), state, http.auth_token().map(str::to_string))?;
    let handle = server.spawn();

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    info!("[reposcan:cli] Shutting down");

    tokio::task::spawn_blocking(move || handle.shutdown())
        .await
        .context("HTTP server shutdown failed")?;
    orchestrator.drain().await;

    Ok(())
}
