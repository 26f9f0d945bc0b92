use super::*;
use std::time::Duration;
use tempfile::TempDir;

fn manager(root: &Path) -> WorkspaceManager {
    WorkspaceManager::new(root.join("clones"), Duration::from_secs(30))
}

#[test]
fn test_allocate_creates_root_and_scan_dir() {
    let dir = TempDir::new().unwrap();
    let manager = manager(dir.path());

    let workspace = manager.allocate("scan-1").unwrap();

    assert_eq!(workspace.scan_id(), "scan-1");
    assert_eq!(workspace.path(), dir.path().join("clones").join("scan-1"));
    assert!(workspace.path().is_dir());
}

#[test]
fn test_allocate_twice_is_rejected() {
    let dir = TempDir::new().unwrap();
    let manager = manager(dir.path());

    manager.allocate("scan-1").unwrap();
    let err = manager.allocate("scan-1").unwrap_err();
    assert!(matches!(err, WorkspaceError::AlreadyAllocated(_)));
}

#[test]
fn test_allocate_rejects_path_like_ids() {
    let dir = TempDir::new().unwrap();
    let manager = manager(dir.path());

    for id in ["", "..", "../escape", "a/b"] {
        let err = manager.allocate(id).unwrap_err();
        assert!(matches!(err, WorkspaceError::InvalidScanId(_)), "{id}");
    }
}

#[test]
fn test_allocate_fails_when_root_is_a_file() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("clones");
    std::fs::write(&root, "not a directory").unwrap();

    let err = manager(dir.path()).allocate("scan-1").unwrap_err();
    assert!(matches!(err, WorkspaceError::Storage { .. }));
}

#[test]
fn test_release_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let manager = manager(dir.path());
    let workspace = manager.allocate("scan-1").unwrap();
    std::fs::create_dir_all(workspace.path().join("nested/deeper")).unwrap();
    std::fs::write(workspace.path().join("nested/deeper/file.py"), "x = 1\n").unwrap();

    manager.release(&workspace);
    assert!(!workspace.path().exists());

    manager.release(&workspace);
    assert!(!workspace.path().exists());
}

#[test]
fn test_guard_releases_on_drop() {
    let dir = TempDir::new().unwrap();
    let manager = manager(dir.path());
    let workspace = manager.allocate("scan-1").unwrap();
    let path = workspace.path().to_path_buf();

    {
        let guard = WorkspaceGuard::new(manager.clone(), workspace);
        assert_eq!(guard.path(), path);
    }
    assert!(!path.exists());
}

#[test]
fn test_guard_releases_during_unwind() {
    let dir = TempDir::new().unwrap();
    let manager = manager(dir.path());
    let workspace = manager.allocate("scan-1").unwrap();
    let path = workspace.path().to_path_buf();

    let result = std::panic::catch_unwind(move || {
        let _guard = WorkspaceGuard::new(manager, workspace);
        panic!("analyzer blew up");
    });

    assert!(result.is_err());
    assert!(!path.exists());
}

#[test]
fn test_check_size_enforces_limit() {
    let dir = TempDir::new().unwrap();
    let manager = manager(dir.path()).with_max_size(Some(1024));
    let workspace = manager.allocate("scan-1").unwrap();

    std::fs::write(workspace.path().join("small.txt"), vec![b'a'; 512]).unwrap();
    assert_eq!(manager.check_size(&workspace).unwrap(), 512);

    std::fs::write(workspace.path().join("big.txt"), vec![b'a'; 1024]).unwrap();
    let err = manager.check_size(&workspace).unwrap_err();
    assert!(matches!(err, WorkspaceError::TooLarge { size_mb: 1, .. }));
}

#[test]
fn test_check_size_without_limit() {
    let dir = TempDir::new().unwrap();
    let manager = manager(dir.path());
    let workspace = manager.allocate("scan-1").unwrap();
    std::fs::write(workspace.path().join("big.txt"), vec![b'a'; 4096]).unwrap();

    assert_eq!(manager.check_size(&workspace).unwrap(), 4096);
}

#[test]
fn test_remove_stale_clears_leftovers() {
    let dir = TempDir::new().unwrap();
    let manager = manager(dir.path());
    manager.allocate("old-1").unwrap();
    manager.allocate("old-2").unwrap();

    assert_eq!(manager.remove_stale(), 2);
    assert_eq!(std::fs::read_dir(manager.root()).unwrap().count(), 0);
}

#[test]
fn test_remove_stale_without_root() {
    let dir = TempDir::new().unwrap();
    assert_eq!(manager(dir.path()).remove_stale(), 0);
}

#[tokio::test]
async fn test_clone_rejects_option_like_reference() {
    let dir = TempDir::new().unwrap();
    let manager = manager(dir.path());
    let workspace = manager.allocate("scan-1").unwrap();

    assert!(!manager.clone_repository(&workspace, "--upload-pack=touch pwned").await);
    assert!(!manager.clone_repository(&workspace, "   ").await);
}

#[tokio::test]
async fn test_clone_of_missing_repository_returns_false() {
    let dir = TempDir::new().unwrap();
    let manager = manager(dir.path());
    let workspace = manager.allocate("scan-1").unwrap();
    let missing = dir.path().join("does-not-exist");

    assert!(
        !manager
            .clone_repository(&workspace, &missing.to_string_lossy())
            .await
    );
}

#[test]
fn test_resolved_path_follows_symlinked_root() {
    let dir = TempDir::new().unwrap();
    let real = dir.path().join("real");
    std::fs::create_dir(&real).unwrap();
    #[cfg(unix)]
    {
        let link = dir.path().join("link");
        std::os::unix::fs::symlink(&real, &link).unwrap();
        let manager = WorkspaceManager::new(&link, Duration::from_secs(30));

        let workspace = manager.allocate("scan-1").unwrap();
        assert_eq!(workspace.path(), link.join("scan-1"));
        assert_eq!(
            workspace.resolved_path(),
            real.canonicalize().unwrap().join("scan-1")
        );
        assert_eq!(workspace.roots()[0], workspace.path());
    }
}

#[test]
fn test_root_lock_is_exclusive_only_when_alone() {
    let dir = TempDir::new().unwrap();
    let manager = manager(dir.path());

    let first = manager.lock_root().unwrap();
    assert_eq!(first.path(), dir.path().join("clones.lock"));
    assert_eq!(first.try_exclusive(|| 7).unwrap(), Some(7));

    let second = manager.lock_root().unwrap();
    assert_eq!(first.try_exclusive(|| 7).unwrap(), None);
    assert_eq!(second.try_exclusive(|| 7).unwrap(), None);

    drop(second);
    assert_eq!(first.try_exclusive(|| 7).unwrap(), Some(7));
}

#[test]
fn test_root_lock_lives_outside_the_root() {
    let dir = TempDir::new().unwrap();
    let manager = manager(dir.path());
    let _lock = manager.lock_root().unwrap();

    manager.allocate("scan-1").unwrap();
    assert_eq!(manager.remove_stale(), 1);
    assert_eq!(std::fs::read_dir(manager.root()).unwrap().count(), 0);
}
