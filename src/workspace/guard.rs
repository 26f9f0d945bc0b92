use std::path::Path;

use super::{Workspace, WorkspaceManager};

/// Ensures a scan's workspace is removed on all exit paths.
///
/// Call [`WorkspaceGuard::release`] on the normal path so removal happens at a
/// known point; dropping the guard (early return, panic unwind) removes it too.
pub struct WorkspaceGuard {
    manager: WorkspaceManager,
    workspace: Workspace,
    released: bool,
}

impl WorkspaceGuard {
    pub fn new(manager: WorkspaceManager, workspace: Workspace) -> Self {
        Self {
            manager,
            workspace,
            released: false,
        }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn path(&self) -> &Path {
        self.workspace.path()
    }

    /// Remove the workspace now
    pub fn release(mut self) {
        self.release_once();
    }

    fn release_once(&mut self) {
        if !self.released {
            self.released = true;
            self.manager.release(&self.workspace);
        }
    }
}

impl Drop for WorkspaceGuard {
    fn drop(&mut self) {
        self.release_once();
    }
}
