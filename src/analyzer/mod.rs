//! Analyzer adapters: one external static-analysis tool each.
//!
//! An adapter runs its tool against a scan workspace and hands back the
//! tool-native findings untouched. Interpreting them is the normalizer's job,
//! driven by the [`FieldMapping`] each adapter publishes.

mod bandit;
mod process;
mod registry;
mod semgrep;

pub use bandit::BanditAnalyzer;
pub use process::ToolCommand;
pub use registry::AnalyzerRegistry;
pub use semgrep::SemgrepAnalyzer;

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::normalizer::FieldMapping;

/// One tool-native finding, opaque to everything but the normalizer
pub type RawFinding = serde_json::Value;

/// What an adapter gets to see of the scan it runs for
#[derive(Debug, Clone)]
pub struct AnalysisContext {
    pub scan_id: String,

    /// Root of the cloned repository. Adapters must treat it as read-only.
    pub workspace: PathBuf,
}

impl AnalysisContext {
    pub fn new(scan_id: impl Into<String>, workspace: impl Into<PathBuf>) -> Self {
        Self {
            scan_id: scan_id.into(),
            workspace: workspace.into(),
        }
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }
}

/// Why an adapter produced no findings
#[derive(Debug, thiserror::Error)]
pub enum AnalyzerError {
    #[error("failed to start {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} produced no output ({status}): {stderr}")]
    NoOutput {
        tool: String,
        status: String,
        stderr: String,
    },

    #[error("{tool} output is not valid JSON: {source}")]
    Parse {
        tool: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{tool} output has no results array")]
    MissingResults { tool: String },

    #[error("{tool} panicked: {message}")]
    Panicked { tool: String, message: String },
}

/// Trait for analyzer adapters
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Tool name, used to tag findings and to look up the field mapping
    fn name(&self) -> &str;

    /// How to read this tool's native findings
    fn field_mapping(&self) -> FieldMapping;

    /// Run the tool against the workspace and return its native findings.
    ///
    /// Implementations may be cancelled at any await point (scan timeout),
    /// so spawned processes must not outlive the returned future.
    async fn run(&self, ctx: &AnalysisContext) -> Result<Vec<RawFinding>, AnalyzerError>;

    /// Check if the tool can be invoked on this machine
    fn is_available(&self) -> bool {
        true
    }
}
