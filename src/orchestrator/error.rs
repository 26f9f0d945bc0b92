use crate::normalizer::NormalizeError;
use crate::registry::RegistryError;
use crate::workspace::WorkspaceError;

/// Errors returned to callers of the orchestrator
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("invalid repository reference: {0}")]
    InvalidSource(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Workspace(#[from] WorkspaceError),

    #[error("the scan orchestrator must be created inside a tokio runtime")]
    NoRuntime,
}

/// Unexpected failure inside the scan pipeline itself.
///
/// Unlike analyzer errors these are never absorbed: the scan fails.
#[derive(Debug, thiserror::Error)]
pub enum OrchestrationFault {
    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error("failed to persist scan result: {0}")]
    Persist(String),

    #[error("scan pipeline panicked: {0}")]
    Panicked(String),
}

/// Anything that turns a scan into a failed one
#[derive(Debug, thiserror::Error)]
pub(crate) enum PipelineError {
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),

    #[error(transparent)]
    Fault(#[from] OrchestrationFault),
}
