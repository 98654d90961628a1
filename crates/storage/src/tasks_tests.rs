// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::Database;
use yare::parameterized;

fn store() -> TaskStore {
    TaskStore::new(Arc::new(Database::open_in_memory().unwrap()))
}

fn quick(store: &TaskStore, title: &str) -> Task {
    store
        .create("p1", NewTask { title: title.to_string(), ..Default::default() })
        .unwrap()
}

#[test]
fn seq_num_is_monotonic_per_project() {
    let store = store();
    let a = quick(&store, "A");
    let b = quick(&store, "B");
    assert_eq!(a.seq_num, 1);
    assert_eq!(b.seq_num, 2);
    let other = store
        .create("p2", NewTask { title: "other".to_string(), ..Default::default() })
        .unwrap();
    assert_eq!(other.seq_num, 1);
}

#[test]
fn create_rejects_empty_title() {
    let store = store();
    let err = store
        .create("p1", NewTask { title: "  ".to_string(), ..Default::default() })
        .unwrap_err();
    assert_eq!(err.kind(), "validation_failed");
}

#[test]
fn resolve_hash_reference() {
    let store = store();
    let task = quick(&store, "A");
    let resolved = store.resolve_task_reference("#1", "p1").unwrap();
    assert_eq!(resolved.id, task.id);
}

#[test]
fn resolve_uuid_reference() {
    let store = store();
    let task = quick(&store, "A");
    let resolved = store.resolve_task_reference(&task.id, "p1").unwrap();
    assert_eq!(resolved.id, task.id);
}

#[test]
fn resolve_dotted_path_walks_parent_chain() {
    let store = store();
    let parent = quick(&store, "Parent");
    let child = store
        .create(
            "p1",
            NewTask {
                title: "Child".to_string(),
                parent_task_id: Some(parent.id.clone()),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(child.seq_num, 2);
    let resolved = store.resolve_task_reference("1.2", "p1").unwrap();
    assert_eq!(resolved.id, child.id);
}

#[test]
fn resolve_dotted_path_rejects_non_child() {
    let store = store();
    quick(&store, "A");
    quick(&store, "B");
    // #2 exists but is not a child of #1.
    let err = store.resolve_task_reference("1.2", "p1").unwrap_err();
    assert!(matches!(err, StorageError::TaskNotFound(_)));
}

#[parameterized(
    gt_prefixed = { "gt-12345" },
    word = { "latest" },
    empty = { "" },
    malformed_hash = { "#abc" },
    short_hex = { "abcd1234" },
)]
fn resolve_rejects_unrecognized_forms(reference: &str) {
    let store = store();
    quick(&store, "A");
    let err = store.resolve_task_reference(reference, "p1").unwrap_err();
    assert!(matches!(err, StorageError::TaskNotFound(_)), "ref: {reference}");
}

#[test]
fn resolve_missing_seq_is_not_found() {
    let store = store();
    assert!(matches!(
        store.resolve_task_reference("#99", "p1"),
        Err(StorageError::TaskNotFound(_))
    ));
}

#[test]
fn close_blocks_on_open_children() {
    let store = store();
    let parent = quick(&store, "Parent");
    store
        .create(
            "p1",
            NewTask {
                title: "Child".to_string(),
                parent_task_id: Some(parent.id.clone()),
                ..Default::default()
            },
        )
        .unwrap();
    let err = store.close(&parent.id, CloseOptions::default()).unwrap_err();
    assert_eq!(err.kind(), "validation_failed");
    assert!(err.to_string().contains("unclosed children"));
}

#[test]
fn close_blocks_without_commits_or_override() {
    let store = store();
    let task = quick(&store, "A");
    let err = store.close(&task.id, CloseOptions::default()).unwrap_err();
    assert_eq!(err.kind(), "validation_failed");
}

#[test]
fn close_with_override_succeeds_when_tree_clean() {
    let store = store();
    let task = quick(&store, "A");
    let closed = store
        .close(
            &task.id,
            CloseOptions { no_commit_needed: true, uncommitted_tracked_changes: false },
        )
        .unwrap();
    assert_eq!(closed.status, TaskStatus::Closed);
}

#[test]
fn close_override_hard_blocks_on_dirty_tree() {
    let store = store();
    let task = quick(&store, "A");
    let err = store
        .close(
            &task.id,
            CloseOptions { no_commit_needed: true, uncommitted_tracked_changes: true },
        )
        .unwrap_err();
    assert_eq!(err.kind(), "uncommitted_changes");
}

#[test]
fn close_with_linked_commit_needs_no_override() {
    let store = store();
    let task = quick(&store, "A");
    store.link_commit(&task.id, "abc123").unwrap();
    let closed = store.close(&task.id, CloseOptions::default()).unwrap();
    assert_eq!(closed.status, TaskStatus::Closed);
    assert_eq!(closed.commits, vec!["abc123"]);
}

#[test]
fn link_commit_dedups() {
    let store = store();
    let task = quick(&store, "A");
    store.link_commit(&task.id, "abc").unwrap();
    store.link_commit(&task.id, "abc").unwrap();
    assert_eq!(store.get(&task.id).unwrap().commits.len(), 1);
}

#[test]
fn dependencies_round_trip() {
    let store = store();
    let a = quick(&store, "A");
    let b = quick(&store, "B");
    store.add_dependency(&a.id, &b.id, DepType::Blocks).unwrap();
    let deps = store.dependencies_of(&a.id).unwrap();
    assert_eq!(deps.len(), 1);
    assert_eq!(deps[0].depends_on_task_id, b.id);
    store.remove_dependency(&a.id, &b.id).unwrap();
    assert!(store.dependencies_of(&a.id).unwrap().is_empty());
}

#[test]
fn self_dependency_rejected() {
    let store = store();
    let a = quick(&store, "A");
    let err = store.add_dependency(&a.id, &a.id, DepType::Blocks).unwrap_err();
    assert_eq!(err.kind(), "validation_failed");
}

#[test]
fn check_cycles_empty_for_acyclic_graph() {
    let store = store();
    let a = quick(&store, "A");
    let b = quick(&store, "B");
    let c = quick(&store, "C");
    store.add_dependency(&a.id, &b.id, DepType::Blocks).unwrap();
    store.add_dependency(&b.id, &c.id, DepType::Blocks).unwrap();
    assert!(store.check_cycles("p1").unwrap().is_empty());
}

#[test]
fn check_cycles_detects_two_node_cycle() {
    let store = store();
    let a = quick(&store, "A");
    let b = quick(&store, "B");
    store.add_dependency(&a.id, &b.id, DepType::Blocks).unwrap();
    store.add_dependency(&b.id, &a.id, DepType::Blocks).unwrap();
    let cycles = store.check_cycles("p1").unwrap();
    assert!(!cycles.is_empty());
    assert!(cycles[0].contains(&a.id) && cycles[0].contains(&b.id));
}

#[test]
fn relates_to_edges_do_not_create_cycles() {
    let store = store();
    let a = quick(&store, "A");
    let b = quick(&store, "B");
    store.add_dependency(&a.id, &b.id, DepType::RelatesTo).unwrap();
    store.add_dependency(&b.id, &a.id, DepType::RelatesTo).unwrap();
    assert!(store.check_cycles("p1").unwrap().is_empty());
}
