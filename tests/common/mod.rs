//! Shared test utilities for scan integration tests
#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::process::Command;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tempfile::TempDir;

use reposcan::analyzer::{AnalysisContext, Analyzer, AnalyzerError, AnalyzerRegistry, RawFinding};
use reposcan::normalizer::FieldMapping;
use reposcan::orchestrator::{OrchestratorConfig, ScanOrchestrator};
use reposcan::registry::{MemoryRegistry, ScanRegistry};

fn git(repo_path: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args(args)
        .current_dir(repo_path)
        .output()
        .expect("Failed to run git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
}

/// Creates a temporary git repository containing `files`, committed
pub fn create_test_repo_with(files: &[(&str, &str)]) -> TempDir {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let repo_path = temp_dir.path();

    git(repo_path, &["init", "--quiet"]);
    git(repo_path, &["config", "user.email", "test@test.com"]);
    git(repo_path, &["config", "user.name", "Test User"]);
    git(repo_path, &["config", "commit.gpgsign", "false"]);

    for (name, content) in files {
        let path = repo_path.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create directory");
        }
        fs::write(path, content).expect("Failed to write file");
    }

    git(repo_path, &["add", "."]);
    git(repo_path, &["commit", "--quiet", "-m", "Initial commit"]);

    temp_dir
}

/// Creates a temporary git repository with a small vulnerable Python file
pub fn create_test_repo() -> TempDir {
    create_test_repo_with(&[
        ("app.py", "import subprocess\n\ndef run(cmd):\n    subprocess.call(cmd, shell=True)\n"),
        ("marker.txt", "default\n"),
    ])
}

/// The repository reference git understands for a local test repo
pub fn repo_ref(repo: &TempDir) -> String {
    repo.path().display().to_string()
}

type Behaviour = dyn Fn(&AnalysisContext) -> Result<Vec<RawFinding>, AnalyzerError> + Send + Sync;

/// Analyzer whose output is computed by a closure instead of a real tool
pub struct FakeAnalyzer {
    name: String,
    mapping: FieldMapping,
    delay: Duration,
    behaviour: Arc<Behaviour>,
}

impl FakeAnalyzer {
    pub fn new(
        name: &str,
        mapping: FieldMapping,
        behaviour: impl Fn(&AnalysisContext) -> Result<Vec<RawFinding>, AnalyzerError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self {
            name: name.to_string(),
            mapping,
            delay: Duration::ZERO,
            behaviour: Arc::new(behaviour),
        }
    }

    /// Fake "bandit" reporting with bandit's field layout
    pub fn bandit(
        behaviour: impl Fn(&AnalysisContext) -> Result<Vec<RawFinding>, AnalyzerError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self::new("bandit", FieldMapping::bandit(), behaviour)
    }

    /// Fake "semgrep" reporting with semgrep's field layout
    pub fn semgrep(
        behaviour: impl Fn(&AnalysisContext) -> Result<Vec<RawFinding>, AnalyzerError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self::new("semgrep", FieldMapping::semgrep(), behaviour)
    }

    /// Sleep before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl Analyzer for FakeAnalyzer {
    fn name(&self) -> &str {
        &self.name
    }

    fn field_mapping(&self) -> FieldMapping {
        self.mapping.clone()
    }

    async fn run(&self, ctx: &AnalysisContext) -> Result<Vec<RawFinding>, AnalyzerError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        (self.behaviour)(ctx)
    }
}

pub fn bandit_finding(path: &str, line: u64, severity: &str, text: &str) -> Value {
    json!({
        "filename": path,
        "line_number": line,
        "issue_severity": severity,
        "issue_text": text,
        "code": format!("{} subprocess.call(cmd, shell=True)\n", line),
        "test_id": "B602"
    })
}

pub fn semgrep_finding(path: &str, line: u64, severity: &str, message: &str) -> Value {
    json!({
        "check_id": "python.lang.security.audit.subprocess-shell-true",
        "path": path,
        "start": {"line": line, "col": 5},
        "end": {"line": line, "col": 38},
        "extra": {"severity": severity, "message": message, "lines": "subprocess.call(cmd, shell=True)"}
    })
}

pub fn registry_of(analyzers: Vec<FakeAnalyzer>) -> AnalyzerRegistry {
    let mut registry = AnalyzerRegistry::new();
    for analyzer in analyzers {
        registry.register(Arc::new(analyzer));
    }
    registry
}

/// Orchestrator over a memory registry with all storage inside a temp dir
pub struct Harness {
    pub dir: TempDir,
    pub registry: Arc<MemoryRegistry>,
    pub orchestrator: Arc<ScanOrchestrator>,
}

impl Harness {
    pub fn new(analyzers: AnalyzerRegistry) -> Self {
        Self::with_config(analyzers, |_| {})
    }

    /// Must be called from inside a tokio runtime
    pub fn with_config(
        analyzers: AnalyzerRegistry,
        adjust: impl FnOnce(&mut OrchestratorConfig),
    ) -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let mut config = OrchestratorConfig {
            clone_dir: dir.path().join("clones"),
            results_dir: dir.path().join("results"),
            max_repo_size_bytes: None,
            scan_timeout: Duration::from_secs(30),
        };
        adjust(&mut config);

        let registry = Arc::new(MemoryRegistry::new());
        Self::with_registry(dir, config, registry, analyzers)
    }

    pub fn with_registry(
        dir: TempDir,
        config: OrchestratorConfig,
        registry: Arc<MemoryRegistry>,
        analyzers: AnalyzerRegistry,
    ) -> Self {
        let shared: Arc<dyn ScanRegistry> = registry.clone();
        let orchestrator = Arc::new(
            ScanOrchestrator::new(config, shared, analyzers)
                .expect("Failed to create orchestrator"),
        );
        Self {
            dir,
            registry,
            orchestrator,
        }
    }

    /// Entries left in the clone root
    pub fn workspace_entries(&self) -> usize {
        match fs::read_dir(&self.orchestrator.config().clone_dir) {
            Ok(entries) => entries.count(),
            Err(_) => 0,
        }
    }
}
