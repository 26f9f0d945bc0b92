//! Per-scan workspaces: an isolated clone of the scanned repository.
//!
//! Every scan owns `<clone_dir>/<scan_id>` for its whole lifetime. The
//! directory is created by [`WorkspaceManager::allocate`], filled by
//! [`WorkspaceManager::clone_repository`] and removed again by
//! [`WorkspaceManager::release`], which never fails loudly so that cleanup
//! problems cannot mask the scan's real outcome.

mod error;
mod guard;
mod lock;

#[cfg(test)]
mod tests;

pub use error::WorkspaceError;
pub use guard::WorkspaceGuard;
pub use lock::RootLock;

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, info, warn};


const BYTES_PER_MB: u64 = 1024 * 1024;

/// A workspace allocated for one scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    scan_id: String,
    path: PathBuf,
    /// `path` with symlinks resolved, captured at allocation
    resolved_path: PathBuf,
}

impl Workspace {
    pub fn scan_id(&self) -> &str {
        &self.scan_id
    }

    /// Root of the cloned repository
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn resolved_path(&self) -> &Path {
        &self.resolved_path
    }

    /// Prefixes under which tools may report absolute paths
    pub fn roots(&self) -> [&Path; 2] {
        [&self.path, &self.resolved_path]
    }
}

/// Allocates, fills and tears down scan workspaces
#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    /// Directory containing one sub-directory per active scan
    root: PathBuf,

    /// Upper bound for `git clone`
    clone_timeout: Duration,

    /// Size ceiling checked after cloning
    max_size_bytes: Option<u64>,
}

impl WorkspaceManager {
    pub fn new(root: impl Into<PathBuf>, clone_timeout: Duration) -> Self {
        Self {
            root: root.into(),
            clone_timeout,
            max_size_bytes: None,
        }
    }

    /// Set the repository size ceiling (`None` disables it)
    pub fn with_max_size(mut self, max_size_bytes: Option<u64>) -> Self {
        self.max_size_bytes = max_size_bytes;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the workspace for `scan_id` lives
    pub fn path_for(&self, scan_id: &str) -> PathBuf {
        self.root.join(scan_id)
    }

    /// Create the workspace directory for a scan.
    ///
    /// Fails if the storage root cannot be created or if a workspace for the
    /// same scan already exists.
    pub fn allocate(&self, scan_id: &str) -> Result<Workspace, WorkspaceError> {
        if !is_safe_scan_id(scan_id) {
            return Err(WorkspaceError::InvalidScanId(scan_id.to_string()));
        }

        std::fs::create_dir_all(&self.root).map_err(|source| WorkspaceError::Storage {
            path: self.root.clone(),
            source,
        })?;

        let path = self.path_for(scan_id);
        match std::fs::create_dir(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(WorkspaceError::AlreadyAllocated(path));
            }
            Err(source) => return Err(WorkspaceError::Storage { path, source }),
        }

        let resolved_path = path.canonicalize().unwrap_or_else(|_| path.clone());
        debug!("[reposcan:workspace] Allocated {}", path.display());
        Ok(Workspace {
            scan_id: scan_id.to_string(),
            path,
            resolved_path,
        })
    }

    /// Clone the full repository history into the workspace.
    ///
    /// Returns false on any network, authentication or malformed-reference
    /// failure; the reason is logged.
    pub async fn clone_repository(&self, workspace: &Workspace, source_ref: &str) -> bool {
        let source_ref = source_ref.trim();
        if source_ref.is_empty() || source_ref.starts_with('-') {
            warn!(
                "[reposcan:workspace] Refusing to clone malformed reference {:?}",
                source_ref
            );
            return false;
        }

        let mut command = Command::new("git");
        command
            .args(["-c", "protocol.ext.allow=never", "clone", "--quiet", "--"])
            .arg(source_ref)
            .arg(&workspace.path)
            .env("GIT_TERMINAL_PROMPT", "0")
            .env("GIT_SSH_COMMAND", "ssh -o BatchMode=yes")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.clone_timeout, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                warn!("[reposcan:workspace] Failed to run git clone: {}", e);
                return false;
            }
            Err(_) => {
                warn!(
                    "[reposcan:workspace] git clone of {} timed out after {:?}",
                    source_ref, self.clone_timeout
                );
                return false;
            }
        };

        if !output.status.success() {
            warn!(
                "[reposcan:workspace] git clone of {} failed ({}): {}",
                source_ref,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return false;
        }

        info!(
            "[reposcan:workspace] Cloned {} into {}",
            source_ref,
            workspace.path.display()
        );
        true
    }

    /// Measure the cloned tree and enforce the size ceiling.
    ///
    /// Returns the size in bytes.
    pub fn check_size(&self, workspace: &Workspace) -> Result<u64, WorkspaceError> {
        let size = directory_size(&workspace.path);
        if let Some(limit) = self.max_size_bytes {
            if size > limit {
                return Err(WorkspaceError::TooLarge {
                    size_mb: size.div_ceil(BYTES_PER_MB),
                    limit_mb: limit / BYTES_PER_MB,
                });
            }
        }
        Ok(size)
    }

    /// Remove the workspace. Idempotent, never fails; errors are logged.
    pub fn release(&self, workspace: &Workspace) {
        remove_tree(&workspace.path);
    }

    /// Take a shared claim on the clone root for the lifetime of the lock
    pub fn lock_root(&self) -> Result<RootLock, WorkspaceError> {
        RootLock::acquire(&self.root)
    }

    /// Remove every directory left under the root, e.g. by a crashed process.
    ///
    /// Only safe while no scan is running in any process; callers hold the
    /// root exclusively (see [`RootLock::try_exclusive`]). Returns the number
    /// of entries removed.
    pub fn remove_stale(&self) -> usize {
        let Ok(entries) = std::fs::read_dir(&self.root) else {
            return 0;
        };

        let mut removed = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                warn!(
                    "[reposcan:workspace] Removing stale workspace {}",
                    path.display()
                );
                remove_tree(&path);
                removed += 1;
            }
        }
        removed
    }
}

fn remove_tree(path: &Path) {
    match std::fs::remove_dir_all(path) {
        Ok(()) => debug!("[reposcan:workspace] Removed {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(
            "[reposcan:workspace] Failed to remove {}: {}",
            path.display(),
            e
        ),
    }
}

/// Total size of all regular files below `path` (symlinks are not followed)
fn directory_size(path: &Path) -> u64 {
    walkdir::WalkDir::new(path)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.metadata().ok())
        .map(|meta| meta.len())
        .sum()
}

/// Scan ids become directory names, so only allow plain identifier characters
fn is_safe_scan_id(scan_id: &str) -> bool {
    !scan_id.is_empty()
        && scan_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
