//! Scan orchestration: drives one scan from PENDING to its terminal status.
//!
//! ```text
//! submit ─▶ PENDING ─▶ IN_PROGRESS ─▶ allocate ─▶ clone ─▶ size check
//!                                        │
//!           ┌─────────── analyzers (one task each) ───────────┐
//!           ▼                                                  ▼
//!        normalize ─▶ release workspace ─▶ write result ─▶ COMPLETED
//!                             (any failure or panic) ──────▶ FAILED
//! ```
//!
//! The workspace is always released before the terminal status is written, so
//! a client that sees COMPLETED or FAILED never finds a leftover clone.

mod error;

pub use error::{OrchestrationFault, OrchestratorError};

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use futures::FutureExt;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::analyzer::{AnalysisContext, AnalyzerError, AnalyzerRegistry};
use crate::config::{Config, Settings};
use crate::normalizer::{Normalizer, ToolFindings};
use crate::registry::{RegistryError, ScanRegistry};
use crate::results::ResultStore;
use crate::workspace::{RootLock, Workspace, WorkspaceError, WorkspaceGuard, WorkspaceManager};
use crate::{ScanId, ScanJob, ScanReport, ScanStatus, ScanUpdate, ToolRun};
use error::PipelineError;

/// Error recorded for scans found IN_PROGRESS at startup
pub const INTERRUPTED_MESSAGE: &str = "scan interrupted before completion";

/// Attempts at moving a scan to IN_PROGRESS before giving up on storage errors
const START_ATTEMPTS: u32 = 3;
const START_RETRY_DELAY: Duration = Duration::from_millis(200);

/// Values the orchestrator needs, fixed at construction
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub clone_dir: PathBuf,
    pub results_dir: PathBuf,
    pub max_repo_size_bytes: Option<u64>,
    /// Bound for the clone and for each analyzer
    pub scan_timeout: Duration,
}

impl From<&Settings> for OrchestratorConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            clone_dir: settings.clone_dir.clone(),
            results_dir: settings.results_dir.clone(),
            max_repo_size_bytes: settings.max_repo_size_bytes(),
            scan_timeout: settings.scan_timeout(),
        }
    }
}

/// What [`ScanOrchestrator::recover_interrupted`] did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Pending scans handed to the executor again
    pub resumed: usize,
    /// In-progress scans marked failed
    pub failed: usize,
    /// Workspace directories left behind by a previous process
    pub stale_workspaces: usize,
}

/// Runs scans in the background and records their outcome
pub struct ScanOrchestrator {
    config: OrchestratorConfig,
    registry: Arc<dyn ScanRegistry>,
    workspaces: WorkspaceManager,
    analyzers: AnalyzerRegistry,
    normalizer: Normalizer,
    results: ResultStore,
    runtime: Handle,
    tasks: Mutex<HashMap<ScanId, JoinHandle<()>>>,
    /// Shared claim on the clone root, see [`Self::recover_interrupted`]
    root_lock: RootLock,
}

impl ScanOrchestrator {
    /// Create an orchestrator bound to the current tokio runtime
    pub fn new(
        config: OrchestratorConfig,
        registry: Arc<dyn ScanRegistry>,
        analyzers: AnalyzerRegistry,
    ) -> Result<Self, OrchestratorError> {
        let runtime = Handle::try_current().map_err(|_| OrchestratorError::NoRuntime)?;
        Self::with_runtime(config, registry, analyzers, runtime)
    }

    /// Create an orchestrator whose scans run on `runtime`
    pub fn with_runtime(
        config: OrchestratorConfig,
        registry: Arc<dyn ScanRegistry>,
        analyzers: AnalyzerRegistry,
        runtime: Handle,
    ) -> Result<Self, OrchestratorError> {
        let workspaces = WorkspaceManager::new(&config.clone_dir, config.scan_timeout)
            .with_max_size(config.max_repo_size_bytes);
        let root_lock = workspaces.lock_root()?;
        let results = ResultStore::new(&config.results_dir);
        let normalizer = analyzers.normalizer();

        Ok(Self {
            config,
            registry,
            workspaces,
            analyzers,
            normalizer,
            results,
            runtime,
            tasks: Mutex::new(HashMap::new()),
            root_lock,
        })
    }

    /// Orchestrator for a loaded configuration with the configured analyzers
    pub fn from_config(
        config: &Config,
        registry: Arc<dyn ScanRegistry>,
    ) -> Result<Self, OrchestratorError> {
        Self::new(
            OrchestratorConfig::from(&config.settings),
            registry,
            AnalyzerRegistry::from_config(config),
        )
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn analyzers(&self) -> &AnalyzerRegistry {
        &self.analyzers
    }

    pub fn results(&self) -> &ResultStore {
        &self.results
    }

    /// Record a new scan and start it in the background.
    ///
    /// Returns the PENDING record immediately.
    pub fn submit(self: &Arc<Self>, repo_url: &str) -> Result<ScanJob, OrchestratorError> {
        let repo_url = repo_url.trim();
        if repo_url.is_empty() {
            return Err(OrchestratorError::InvalidSource(
                "repository reference is empty".to_string(),
            ));
        }

        let job = ScanJob::new(repo_url);
        self.registry.create(&job)?;
        info!(
            "[reposcan:scan] Scan {} submitted for {}",
            job.scan_id, job.repo_url
        );

        self.spawn(job.scan_id.clone());
        Ok(job)
    }

    pub fn get(&self, scan_id: &str) -> Result<ScanJob, RegistryError> {
        self.registry.get(scan_id)
    }

    pub fn list(
        &self,
        status: Option<ScanStatus>,
        limit: Option<usize>,
    ) -> Result<Vec<ScanJob>, RegistryError> {
        self.registry.list(status, limit)
    }

    /// Wait for a scan started by this orchestrator, then return its record
    pub async fn wait(&self, scan_id: &str) -> Result<ScanJob, RegistryError> {
        let handle = self.tasks().remove(scan_id);
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!("[reposcan:scan] Scan task {} ended abnormally: {}", scan_id, e);
            }
        }
        let registry = Arc::clone(&self.registry);
        let scan_id = scan_id.to_string();
        self.blocking(move || registry.get(&scan_id))
            .await
            .unwrap_or_else(|fault| Err(RegistryError::Task(fault.to_string())))
    }

    /// Wait for every running scan, including ones submitted meanwhile
    pub async fn drain(&self) {
        loop {
            let handles: Vec<_> = self.tasks().drain().collect();
            if handles.is_empty() {
                break;
            }

            info!("[reposcan:scan] Waiting for {} running scan(s)", handles.len());
            for (scan_id, result) in futures::future::join_all(
                handles
                    .into_iter()
                    .map(|(scan_id, handle)| async move { (scan_id, handle.await) }),
            )
            .await
            {
                if let Err(e) = result {
                    error!("[reposcan:scan] Scan task {} ended abnormally: {}", scan_id, e);
                }
            }
        }
    }

    /// Number of scans currently executing in this process
    pub fn running(&self) -> usize {
        self.tasks().values().filter(|h| !h.is_finished()).count()
    }

    /// Repair the registry after an unclean shutdown.
    ///
    /// Must run before the first submission: scans left IN_PROGRESS are failed,
    /// every directory under the clone root is removed and PENDING scans are
    /// started again.
    ///
    /// Skipped entirely while another live process uses the same clone root,
    /// since its scans and workspaces are not orphans.
    pub fn recover_interrupted(self: &Arc<Self>) -> Result<RecoveryReport, OrchestratorError> {
        match self.root_lock.try_exclusive(|| self.recover_orphans())? {
            Some(report) => report,
            None => {
                warn!(
                    "[reposcan:scan] {} is in use by another process, skipping recovery",
                    self.config.clone_dir.display()
                );
                Ok(RecoveryReport::default())
            }
        }
    }

    fn recover_orphans(self: &Arc<Self>) -> Result<RecoveryReport, OrchestratorError> {
        let mut report = RecoveryReport::default();

        for job in self.registry.list(Some(ScanStatus::InProgress), None)? {
            let update = ScanUpdate::failed(INTERRUPTED_MESSAGE, job.tool_runs.clone());
            match self
                .registry
                .update(&job.scan_id, ScanStatus::InProgress, update)
            {
                Ok(_) => {
                    warn!(
                        "[reposcan:scan] Scan {} was interrupted, marked failed",
                        job.scan_id
                    );
                    report.failed += 1;
                }
                Err(RegistryError::Conflict { .. }) => {}
                Err(e) => return Err(e.into()),
            }
        }

        report.stale_workspaces = self.workspaces.remove_stale();

        for job in self.registry.list(Some(ScanStatus::Pending), None)? {
            info!("[reposcan:scan] Resuming pending scan {}", job.scan_id);
            self.spawn(job.scan_id);
            report.resumed += 1;
        }

        Ok(report)
    }

    fn tasks(&self) -> MutexGuard<'_, HashMap<ScanId, JoinHandle<()>>> {
        self.tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn spawn(self: &Arc<Self>, scan_id: ScanId) {
        let this = Arc::clone(self);
        let task_id = scan_id.clone();
        let handle = self
            .runtime
            .spawn(async move { this.execute(&task_id).await });

        let mut tasks = self.tasks();
        tasks.retain(|_, h| !h.is_finished());
        tasks.insert(scan_id, handle);
    }

    /// Run the pipeline for one scan and write its terminal status
    async fn execute(&self, scan_id: &str) {
        let Some(job) = self.start(scan_id).await else {
            return;
        };
        info!("[reposcan:scan] Scan {} started", scan_id);

        let mut tool_runs = Vec::new();
        let outcome = AssertUnwindSafe(self.run_pipeline(&job, &mut tool_runs))
            .catch_unwind()
            .await;

        // Any workspace guard has been dropped by now, panics included
        let update = match outcome {
            Ok(Ok(report)) => {
                info!(
                    "[reposcan:scan] Scan {} completed with {} finding(s)",
                    scan_id,
                    report.vulnerabilities.len()
                );
                ScanUpdate::completed(report, tool_runs)
            }
            Ok(Err(e)) => {
                warn!("[reposcan:scan] Scan {} failed: {}", scan_id, e);
                ScanUpdate::failed(e.to_string(), tool_runs)
            }
            Err(panic) => {
                let fault = OrchestrationFault::Panicked(panic_message(panic.as_ref()));
                error!("[reposcan:scan] Scan {} failed: {}", scan_id, fault);
                ScanUpdate::failed(fault.to_string(), tool_runs)
            }
        };

        if let Err(e) = self
            .update_status(scan_id, ScanStatus::InProgress, update)
            .await
        {
            error!(
                "[reposcan:scan] Failed to record outcome of scan {}: {}",
                scan_id, e
            );
        }
    }

    /// Move the scan to IN_PROGRESS, retrying storage errors a few times.
    ///
    /// Returns `None` when the scan must not run here: it was already picked
    /// up or finished elsewhere, or the registry stays unavailable.
    async fn start(&self, scan_id: &str) -> Option<ScanJob> {
        for attempt in 1..=START_ATTEMPTS {
            match self
                .update_status(scan_id, ScanStatus::Pending, ScanUpdate::started())
                .await
            {
                Ok(job) => return Some(job),
                Err(
                    e @ (RegistryError::Conflict { .. }
                    | RegistryError::NotFound(_)
                    | RegistryError::InvalidTransition(_)),
                ) => {
                    warn!("[reposcan:scan] Not starting scan {}: {}", scan_id, e);
                    return None;
                }
                Err(e) if attempt < START_ATTEMPTS => {
                    warn!(
                        "[reposcan:scan] Could not start scan {} (attempt {}/{}): {}",
                        scan_id, attempt, START_ATTEMPTS, e
                    );
                    tokio::time::sleep(START_RETRY_DELAY * attempt).await;
                }
                Err(e) => {
                    error!(
                        "[reposcan:scan] Giving up on scan {}, it stays pending until restart: {}",
                        scan_id, e
                    );
                }
            }
        }
        None
    }

    async fn update_status(
        &self,
        scan_id: &str,
        expected: ScanStatus,
        update: ScanUpdate,
    ) -> Result<ScanJob, RegistryError> {
        let registry = Arc::clone(&self.registry);
        let scan_id = scan_id.to_string();
        self.blocking(move || registry.update(&scan_id, expected, update))
            .await
            .unwrap_or_else(|fault| Err(RegistryError::Task(fault.to_string())))
    }

    /// Run filesystem or storage work on the blocking pool
    async fn blocking<T, F>(&self, work: F) -> Result<T, OrchestrationFault>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        self.runtime.spawn_blocking(work).await.map_err(|e| {
            OrchestrationFault::Panicked(if e.is_panic() {
                panic_message(e.into_panic().as_ref())
            } else {
                e.to_string()
            })
        })
    }

    async fn run_pipeline(
        &self,
        job: &ScanJob,
        tool_runs: &mut Vec<ToolRun>,
    ) -> Result<ScanReport, PipelineError> {
        let workspaces = self.workspaces.clone();
        let scan_id = job.scan_id.clone();
        let workspace = self.blocking(move || workspaces.allocate(&scan_id)).await??;
        let guard = WorkspaceGuard::new(self.workspaces.clone(), workspace);

        let outcome = self.analyze(job, guard.workspace(), tool_runs).await;

        // Removed on every outcome, before anything is persisted
        self.blocking(move || guard.release()).await?;
        let report = outcome?;

        let results = self.results.clone();
        let persisted = report.clone();
        self.blocking(move || results.write(&persisted))
            .await?
            .map_err(|e| OrchestrationFault::Persist(format!("{:#}", e)))?;

        Ok(report)
    }

    /// Clone, measure, run the analyzers and normalize, all inside `workspace`
    async fn analyze(
        &self,
        job: &ScanJob,
        workspace: &Workspace,
        tool_runs: &mut Vec<ToolRun>,
    ) -> Result<ScanReport, PipelineError> {
        if !self
            .workspaces
            .clone_repository(workspace, &job.repo_url)
            .await
        {
            return Err(WorkspaceError::CloneFailed(job.repo_url.clone()).into());
        }

        let workspaces = self.workspaces.clone();
        let measured = workspace.clone();
        let size = self
            .blocking(move || workspaces.check_size(&measured))
            .await??;
        debug!(
            "[reposcan:scan] Scan {} workspace holds {} bytes",
            job.scan_id, size
        );

        let ctx = AnalysisContext::new(&job.scan_id, workspace.path());
        let contributions = self.run_analyzers(&ctx, tool_runs).await;

        let report = self
            .normalizer
            .normalize(&job.scan_id, &job.repo_url, &workspace.roots(), &contributions)
            .map_err(OrchestrationFault::from)?;
        Ok(report)
    }

    /// Run every analyzer in its own task and collect what succeeded.
    ///
    /// Failures, timeouts and panics become a [`ToolRun`] and no findings.
    async fn run_analyzers(
        &self,
        ctx: &AnalysisContext,
        tool_runs: &mut Vec<ToolRun>,
    ) -> Vec<ToolFindings> {
        let timeout = self.config.scan_timeout;

        let pending = self.analyzers.iter().map(|analyzer| {
            let analyzer = Arc::clone(analyzer);
            let name = analyzer.name().to_string();
            let ctx = ctx.clone();
            let started = Instant::now();
            let handle = self
                .runtime
                .spawn(async move { tokio::time::timeout(timeout, analyzer.run(&ctx)).await });
            async move { (name, started, handle.await) }
        });

        let mut contributions = Vec::new();
        for (name, started, joined) in futures::future::join_all(pending).await {
            let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

            let error = match joined {
                Ok(Ok(Ok(findings))) => {
                    debug!(
                        "[reposcan:analyzer] {} returned {} finding(s) for scan {}",
                        name,
                        findings.len(),
                        ctx.scan_id
                    );
                    tool_runs.push(ToolRun::succeeded(&name, findings.len(), elapsed_ms));
                    contributions.push(ToolFindings::new(name, findings));
                    continue;
                }
                Ok(Ok(Err(e))) => e,
                Ok(Err(_elapsed)) => {
                    warn!(
                        "[reposcan:analyzer] {} timed out for scan {}",
                        name, ctx.scan_id
                    );
                    tool_runs.push(ToolRun::timed_out(&name, elapsed_ms));
                    continue;
                }
                Err(join_error) => AnalyzerError::Panicked {
                    tool: name.clone(),
                    message: if join_error.is_panic() {
                        panic_message(join_error.into_panic().as_ref())
                    } else {
                        join_error.to_string()
                    },
                },
            };

            warn!(
                "[reposcan:analyzer] {} failed for scan {}: {}",
                name, ctx.scan_id, error
            );
            tool_runs.push(ToolRun::failed(&name, error.to_string(), elapsed_ms));
        }

        contributions
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
