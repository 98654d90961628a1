// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::Database;

fn store() -> PromptStore {
    PromptStore::new(Arc::new(Database::open_in_memory().unwrap()))
}

#[test]
fn upsert_replaces_content_on_same_identity() {
    let store = store();
    store
        .upsert("skills/review", PromptTier::User, None, None, "", "", "v1")
        .unwrap();
    let updated = store
        .upsert("skills/review", PromptTier::User, None, None, "", "", "v2")
        .unwrap();
    assert_eq!(updated.content, "v2");
    assert_eq!(store.list(None).unwrap().len(), 1);
}

#[test]
fn same_path_different_tiers_coexist() {
    let store = store();
    store
        .upsert("skills/review", PromptTier::Bundled, None, None, "", "", "bundled")
        .unwrap();
    store
        .upsert("skills/review", PromptTier::User, None, None, "", "", "user")
        .unwrap();
    store
        .upsert("skills/review", PromptTier::Project, Some("p1"), None, "", "", "project")
        .unwrap();
    assert_eq!(store.list(Some("p1")).unwrap().len(), 3);
}

#[test]
fn resolve_prefers_project_then_user_then_bundled() {
    let store = store();
    store
        .upsert("skills/review", PromptTier::Bundled, None, None, "", "", "bundled")
        .unwrap();
    assert_eq!(store.resolve("skills/review", Some("p1")).unwrap().unwrap().content, "bundled");

    store
        .upsert("skills/review", PromptTier::User, None, None, "", "", "user")
        .unwrap();
    assert_eq!(store.resolve("skills/review", Some("p1")).unwrap().unwrap().content, "user");

    store
        .upsert("skills/review", PromptTier::Project, Some("p1"), None, "", "", "project")
        .unwrap();
    assert_eq!(store.resolve("skills/review", Some("p1")).unwrap().unwrap().content, "project");
    // A different project still sees the user tier.
    assert_eq!(store.resolve("skills/review", Some("p2")).unwrap().unwrap().content, "user");
}

#[test]
fn resolve_unknown_path_is_none() {
    let store = store();
    assert!(store.resolve("skills/none", None).unwrap().is_none());
}
