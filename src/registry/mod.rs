//! Durable store of scan records.
//!
//! Status changes go through [`ScanRegistry::update`], a compare-and-set keyed
//! by `(scan_id, expected status)`, so two writers can never both move a scan
//! out of the same state.

mod memory;
mod sqlite;

pub use memory::MemoryRegistry;
pub use sqlite::SqliteRegistry;

use crate::{ScanId, ScanJob, ScanStatus, ScanUpdate, TransitionError};

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("scan {0} already exists")]
    AlreadyExists(ScanId),

    #[error("scan {0} not found")]
    NotFound(ScanId),

    #[error("scan {scan_id} is {actual}, expected {expected}")]
    Conflict {
        scan_id: ScanId,
        expected: ScanStatus,
        actual: ScanStatus,
    },

    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),

    #[error("scan registry storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("scan registry serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("scan registry lock poisoned")]
    Poisoned,

    #[error("scan registry task failed: {0}")]
    Task(String),

    #[error("corrupt scan record {scan_id}: {reason}")]
    Corrupt { scan_id: ScanId, reason: String },
}

/// Storage for scan records
pub trait ScanRegistry: Send + Sync {
    /// Insert a new record; fails if the id is taken
    fn create(&self, job: &ScanJob) -> Result<(), RegistryError>;

    fn get(&self, scan_id: &str) -> Result<ScanJob, RegistryError>;

    /// Apply `update` if the stored status still equals `expected`.
    ///
    /// Returns the record as stored after the update.
    fn update(
        &self,
        scan_id: &str,
        expected: ScanStatus,
        update: ScanUpdate,
    ) -> Result<ScanJob, RegistryError>;

    /// Newest first, optionally filtered by status
    fn list(
        &self,
        status: Option<ScanStatus>,
        limit: Option<usize>,
    ) -> Result<Vec<ScanJob>, RegistryError>;
}
