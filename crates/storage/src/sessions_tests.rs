// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::Database;
use gobby_core::SessionSource::{Claude, Gemini};

fn store() -> SessionStore {
    SessionStore::new(Arc::new(Database::open_in_memory().unwrap()))
}

#[test]
fn register_is_idempotent_on_identity() {
    let store = store();
    let first = store
        .register("ext-1", "m1", Claude, "p1", RegisterSession::default())
        .unwrap();
    let second = store
        .register("ext-1", "m1", Claude, "p1", RegisterSession::default())
        .unwrap();
    assert_eq!(first.id, second.id);
}

#[test]
fn register_distinguishes_source() {
    let store = store();
    let claude = store
        .register("ext-1", "m1", Claude, "p1", RegisterSession::default())
        .unwrap();
    let gemini = store
        .register("ext-1", "m1", Gemini, "p1", RegisterSession::default())
        .unwrap();
    assert_ne!(claude.id, gemini.id);
}

#[test]
fn register_preserves_existing_fields_on_null_input() {
    let store = store();
    let fields = RegisterSession {
        title: Some("First title".to_string()),
        jsonl_path: Some("/tmp/t.jsonl".to_string()),
        ..Default::default()
    };
    store.register("ext-1", "m1", Claude, "p1", fields).unwrap();
    let again = store
        .register("ext-1", "m1", Claude, "p1", RegisterSession::default())
        .unwrap();
    assert_eq!(again.title.as_deref(), Some("First title"));
    assert_eq!(again.jsonl_path.as_deref(), Some("/tmp/t.jsonl"));
}

#[test]
fn register_updates_fields_when_provided() {
    let store = store();
    store.register("ext-1", "m1", Claude, "p1", RegisterSession::default()).unwrap();
    let updated = store
        .register(
            "ext-1",
            "m1",
            Claude,
            "p1",
            RegisterSession { title: Some("New".to_string()), ..Default::default() },
        )
        .unwrap();
    assert_eq!(updated.title.as_deref(), Some("New"));
}

#[test]
fn status_transitions_persist() {
    let store = store();
    let session = store
        .register("ext-1", "m1", Claude, "p1", RegisterSession::default())
        .unwrap();
    store.set_status(&session.id, SessionStatus::HandoffReady).unwrap();
    assert_eq!(store.get(&session.id).unwrap().status, SessionStatus::HandoffReady);
}

#[test]
fn set_status_unknown_session_is_not_found() {
    let store = store();
    let err = store.set_status("missing", SessionStatus::Paused).unwrap_err();
    assert_eq!(err.kind(), "not_found");
}

#[test]
fn find_parent_returns_most_recent_handoff_ready() {
    let store = store();
    let older = store
        .register("ext-a", "m1", Claude, "p1", RegisterSession::default())
        .unwrap();
    store.set_status(&older.id, SessionStatus::HandoffReady).unwrap();
    std::thread::sleep(std::time::Duration::from_millis(2));
    let newer = store
        .register("ext-b", "m1", Claude, "p1", RegisterSession::default())
        .unwrap();
    store.set_status(&newer.id, SessionStatus::HandoffReady).unwrap();

    let found = store
        .find_parent("m1", "p1", Claude, SessionStatus::HandoffReady)
        .unwrap()
        .unwrap();
    assert_eq!(found.id, newer.id);
}

#[test]
fn find_parent_filters_tuple_and_status() {
    let store = store();
    let session = store
        .register("ext-a", "m1", Claude, "p1", RegisterSession::default())
        .unwrap();
    // Active, not handoff_ready.
    assert!(store
        .find_parent("m1", "p1", Claude, SessionStatus::HandoffReady)
        .unwrap()
        .is_none());
    store.set_status(&session.id, SessionStatus::HandoffReady).unwrap();
    // Wrong machine.
    assert!(store
        .find_parent("m2", "p1", Claude, SessionStatus::HandoffReady)
        .unwrap()
        .is_none());
    // Wrong source.
    assert!(store
        .find_parent("m1", "p1", Gemini, SessionStatus::HandoffReady)
        .unwrap()
        .is_none());
}

#[test]
fn summary_and_compact_markdown_round_trip() {
    let store = store();
    let session = store
        .register("ext-1", "m1", Claude, "p1", RegisterSession::default())
        .unwrap();
    store.set_summary(&session.id, "done").unwrap();
    store.set_compact_markdown(&session.id, "## Handoff").unwrap();
    let loaded = store.get(&session.id).unwrap();
    assert_eq!(loaded.summary_markdown.as_deref(), Some("done"));
    assert_eq!(loaded.compact_markdown.as_deref(), Some("## Handoff"));
}

#[test]
fn ancestor_depth_counts_chain() {
    let store = store();
    let root = store
        .register("root", "m1", Claude, "p1", RegisterSession::default())
        .unwrap();
    let child = store
        .register(
            "child",
            "m1",
            Claude,
            "p1",
            RegisterSession {
                parent_session_id: Some(root.id.clone()),
                agent_depth: Some(1),
                ..Default::default()
            },
        )
        .unwrap();
    let grandchild = store
        .register(
            "grandchild",
            "m1",
            Claude,
            "p1",
            RegisterSession {
                parent_session_id: Some(child.id.clone()),
                agent_depth: Some(2),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(store.ancestor_depth(&root.id).unwrap(), 0);
    assert_eq!(store.ancestor_depth(&child.id).unwrap(), 1);
    assert_eq!(store.ancestor_depth(&grandchild.id).unwrap(), 2);
}
