// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use gobby_core::ProjectSidecar;

fn store() -> ProjectStore {
    ProjectStore::new(Arc::new(Database::open_in_memory().unwrap()))
}

#[test]
fn ensure_creates_row_and_sidecar() {
    let store = store();
    let repo = tempfile::tempdir().unwrap();
    let project = store.ensure(repo.path(), "demo").unwrap();
    assert_eq!(project.name, "demo");

    let sidecar = read_sidecar(repo.path()).unwrap();
    assert_eq!(sidecar.id, project.id);
    assert_eq!(sidecar.name, "demo");
    assert!(sidecar.parent_project_path.is_none());
}

#[test]
fn ensure_is_idempotent() {
    let store = store();
    let repo = tempfile::tempdir().unwrap();
    let first = store.ensure(repo.path(), "demo").unwrap();
    let second = store.ensure(repo.path(), "demo").unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(store.list().unwrap().len(), 1);
}

#[test]
fn ensure_honors_existing_sidecar() {
    let store = store();
    let repo = tempfile::tempdir().unwrap();
    let sidecar = ProjectSidecar {
        id: gobby_core::new_uuid(),
        name: "pinned".to_string(),
        parent_project_path: Some("/main".to_string()),
    };
    write_sidecar(&ProjectSidecar::path_for(repo.path()), &sidecar).unwrap();

    let project = store.ensure(repo.path(), "demo").unwrap();
    assert_eq!(project.id, sidecar.id);
    // Existing sidecar is never rewritten.
    let kept = read_sidecar(repo.path()).unwrap();
    assert_eq!(kept, sidecar);
}

#[test]
fn get_by_path_and_not_found() {
    let store = store();
    let repo = tempfile::tempdir().unwrap();
    assert!(store.get_by_path(repo.path()).unwrap().is_none());
    let project = store.ensure(repo.path(), "demo").unwrap();
    assert_eq!(store.get_by_path(repo.path()).unwrap().unwrap().id, project.id);
    assert_eq!(store.get("missing").unwrap_err().kind(), "not_found");
}
