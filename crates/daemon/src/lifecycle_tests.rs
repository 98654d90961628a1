// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn paths_in(dir: &std::path::Path) -> DaemonPaths {
    DaemonPaths {
        state_dir: dir.to_path_buf(),
        database: dir.join("gobby.db"),
        lock: dir.join("gobbyd.pid"),
        logs_dir: dir.join("logs"),
        worktrees_dir: dir.join("worktrees"),
    }
}

#[tokio::test]
async fn startup_wires_state_and_writes_pid() {
    let tmp = tempfile::tempdir().unwrap();
    let config = DaemonConfig::default();
    let result = startup(&config, paths_in(tmp.path())).unwrap();

    assert!(tmp.path().join("gobbyd.pid").exists());
    let pid_text = std::fs::read_to_string(tmp.path().join("gobbyd.pid")).unwrap();
    assert_eq!(pid_text.trim(), std::process::id().to_string());

    assert_eq!(result.state.registry.count(), 0);
    assert_eq!(result.state.adapters.names().len(), 5);
    result.shutdown.cancel();
}

#[tokio::test]
async fn second_startup_on_same_state_dir_fails() {
    let tmp = tempfile::tempdir().unwrap();
    let config = DaemonConfig::default();
    let first = startup(&config, paths_in(tmp.path())).unwrap();

    let second = startup(&config, paths_in(tmp.path()));
    assert!(matches!(second, Err(LifecycleError::AlreadyRunning(_))));
    first.shutdown.cancel();
}

#[tokio::test]
async fn startup_creates_database_with_schema() {
    let tmp = tempfile::tempdir().unwrap();
    let config = DaemonConfig::default();
    let result = startup(&config, paths_in(tmp.path())).unwrap();
    assert!(tmp.path().join("gobby.db").exists());
    // The stores are live against the migrated schema.
    assert!(result.state.sessions.list_all(10).unwrap().is_empty());
    result.shutdown.cancel();
}
