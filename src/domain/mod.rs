//! Core domain types for reposcan

mod scan;
mod tool_run;
mod vulnerability;

pub use scan::{ScanId, ScanJob, ScanStatus, ScanUpdate, TransitionError};
pub use tool_run::{ToolRun, ToolRunStatus};
pub use vulnerability::{ScanReport, Severity, Vulnerability};
