use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::debug;

use super::WorkspaceError;

/// Advisory lock on a clone root, shared by every live process using it.
///
/// Each orchestrator keeps a shared lock for its lifetime. Cleanup of the
/// whole root (restart recovery) needs the lock exclusively, which only
/// succeeds when no other process is scanning into the same root.
#[derive(Debug)]
pub struct RootLock {
    file: File,
    path: PathBuf,
}

impl RootLock {
    /// Open `<root>.lock` next to the root and take a shared lock on it
    pub fn acquire(root: &Path) -> Result<Self, WorkspaceError> {
        let path = lock_path(root);
        let storage_error = |source| WorkspaceError::Storage {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(storage_error)?;
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(storage_error)?;
        FileExt::lock_shared(&file).map_err(storage_error)?;

        debug!("[reposcan:workspace] Holding {}", path.display());
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Upgrade to an exclusive lock, run `f`, then go back to shared.
    ///
    /// Returns `None` without running `f` while another process holds the root.
    pub fn try_exclusive<T>(&self, f: impl FnOnce() -> T) -> Result<Option<T>, WorkspaceError> {
        let storage_error = |source| WorkspaceError::Storage {
            path: self.path.clone(),
            source,
        };

        FileExt::unlock(&self.file).map_err(storage_error)?;
        let outcome = match FileExt::try_lock_exclusive(&self.file) {
            Ok(()) => {
                let value = f();
                FileExt::unlock(&self.file).map_err(storage_error)?;
                Some(value)
            }
            Err(_) => None,
        };
        FileExt::lock_shared(&self.file).map_err(storage_error)?;
        Ok(outcome)
    }
}

/// `<clone_dir>.lock`, kept outside the root so stale cleanup never sees it
fn lock_path(root: &Path) -> PathBuf {
    let mut name = root.as_os_str().to_owned();
    name.push(".lock");
    PathBuf::from(name)
}
