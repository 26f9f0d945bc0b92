//! reposcan - repository security scanning
//!
//! reposcan takes a git repository reference, clones it into a private
//! workspace, runs several static-analysis security tools against it
//! concurrently and merges their findings into one normalized report.
//!
//! ## Pipeline
//!
//! 1. **Submit**: a [`ScanJob`] is recorded as `pending` in a
//!    [`registry::ScanRegistry`] and handed to the background executor.
//! 2. **Prepare**: the [`workspace::WorkspaceManager`] clones the repository
//!    into `<clone_dir>/<scan_id>`.
//! 3. **Analyze**: every [`analyzer::Analyzer`] (bandit, semgrep) runs in its
//!    own task. A failing tool only loses its own findings.
//! 4. **Normalize**: the [`normalizer::Normalizer`] maps tool-native output
//!    onto [`Vulnerability`] records.
//! 5. **Finish**: the workspace is removed, the report is written to
//!    `<results_dir>/<scan_id>.json` and the scan becomes `completed`
//!    (or `failed`).

pub mod analyzer;
pub mod config;
pub mod domain;
pub mod normalizer;
pub mod orchestrator;
pub mod registry;
pub mod results;
pub mod server;
pub mod workspace;

pub use domain::*;
