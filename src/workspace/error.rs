use std::path::PathBuf;

/// Errors raised while preparing a scan workspace
#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    #[error("failed to create workspace storage at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid scan id for a workspace: {0:?}")]
    InvalidScanId(String),

    #[error("workspace already exists: {0}")]
    AlreadyAllocated(PathBuf),

    #[error("failed to clone repository {0}")]
    CloneFailed(String),

    #[error("repository is {size_mb} MB, exceeding the {limit_mb} MB limit")]
    TooLarge { size_mb: u64, limit_mb: u64 },
}
