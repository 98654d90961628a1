// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use gobby_storage::{Database, WorkflowStateStore};
use std::sync::Arc;

fn manager() -> WorkflowStateManager {
    let db = Arc::new(Database::open_in_memory().unwrap());
    WorkflowStateManager::new(WorkflowStateStore::new(db))
}

#[test]
fn get_or_create_seeds_step_and_defaults() {
    let manager = manager();
    let mut defaults = std::collections::HashMap::new();
    defaults.insert("max_concurrent".to_string(), serde_json::json!(3));
    let state = manager.get_or_create("s1", "orchestrator", "dispatch", &defaults).unwrap();
    assert_eq!(state.step, "dispatch");
    assert_eq!(state.variables.get("max_concurrent"), Some(&serde_json::json!(3)));
    // Second call does not reset anything.
    manager.transition_step("s1", "orchestrator", "collect").unwrap();
    let again = manager.get_or_create("s1", "orchestrator", "dispatch", &defaults).unwrap();
    assert_eq!(again.step, "collect");
}

#[test]
fn transition_resets_step_counter() {
    let manager = manager();
    manager
        .store()
        .mutate("s1", "w", |state| {
            state.step = "one".to_string();
            state.step_action_count = 7;
            state.total_action_count = 7;
            Ok(())
        })
        .unwrap();
    manager.transition_step("s1", "w", "two").unwrap();
    let state = manager.get("s1", "w").unwrap().unwrap();
    assert_eq!(state.step, "two");
    assert_eq!(state.step_action_count, 0);
    assert_eq!(state.total_action_count, 7);
    assert!(state.step_entered_at.is_some());
}

#[test]
fn orchestration_append_and_remove() {
    let manager = manager();
    manager
        .update_orchestration_lists(
            "s1",
            "w",
            OrchestrationUpdate {
                append_to_spawned: vec!["a1".to_string(), "a2".to_string()],
                ..Default::default()
            },
        )
        .unwrap();
    let state = manager
        .update_orchestration_lists(
            "s1",
            "w",
            OrchestrationUpdate {
                remove_from_spawned: vec!["a1".to_string()],
                append_to_completed: vec!["a1".to_string()],
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(state.spawned_agents(), vec!["a2".to_string()]);
    assert_eq!(state.completed_agents(), vec!["a1".to_string()]);
}

#[test]
fn replace_takes_precedence_over_remove() {
    let manager = manager();
    manager
        .update_orchestration_lists(
            "s1",
            "w",
            OrchestrationUpdate {
                append_to_spawned: vec!["a1".to_string(), "a2".to_string()],
                ..Default::default()
            },
        )
        .unwrap();
    let state = manager
        .update_orchestration_lists(
            "s1",
            "w",
            OrchestrationUpdate {
                replace_spawned: Some(vec!["a9".to_string()]),
                remove_from_spawned: vec!["a9".to_string()],
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(state.spawned_agents(), vec!["a9".to_string()]);
}

#[test]
fn orchestration_updates_preserve_unrelated_variables() {
    let manager = manager();
    manager
        .store()
        .mutate("s1", "w", |state| {
            state.variables.insert("custom".to_string(), serde_json::json!("keep"));
            Ok(())
        })
        .unwrap();
    manager
        .update_orchestration_lists(
            "s1",
            "w",
            OrchestrationUpdate {
                append_to_failed: vec!["a1".to_string()],
                ..Default::default()
            },
        )
        .unwrap();
    let state = manager.get("s1", "w").unwrap().unwrap();
    assert_eq!(state.variables.get("custom"), Some(&serde_json::json!("keep")));
}

#[test]
fn slot_reservation_respects_cap() {
    let manager = manager();
    manager
        .update_orchestration_lists(
            "s1",
            "w",
            OrchestrationUpdate {
                append_to_spawned: vec!["a1".to_string()],
                ..Default::default()
            },
        )
        .unwrap();
    // Cap 3, one spawned: two slots available.
    let granted = manager.check_and_reserve_slots("s1", "w", 3, 5).unwrap();
    assert_eq!(granted, 2);
    // Everything is now accounted for.
    assert_eq!(manager.check_and_reserve_slots("s1", "w", 3, 1).unwrap(), 0);
}

#[test]
fn release_floors_at_zero() {
    let manager = manager();
    manager.check_and_reserve_slots("s1", "w", 2, 2).unwrap();
    manager.release_reserved_slots("s1", "w", 10).unwrap();
    let state = manager.get("s1", "w").unwrap().unwrap();
    assert_eq!(state.reserved_slots(), 0);
}

#[test]
fn concurrent_reservations_never_exceed_cap() {
    // Spec scenario: K concurrent reservations against max M total ≤ M.
    let db = Arc::new(Database::open_in_memory().unwrap());
    let manager = Arc::new(WorkflowStateManager::new(WorkflowStateStore::new(db)));
    let max = 3u64;
    let mut handles = Vec::new();
    for _ in 0..8 {
        let manager = Arc::clone(&manager);
        handles.push(std::thread::spawn(move || {
            manager.check_and_reserve_slots("s1", "w", max, max).unwrap()
        }));
    }
    let total: u64 = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert!(total <= max, "reserved {total} > cap {max}");
    let state = manager.get("s1", "w").unwrap().unwrap();
    assert_eq!(state.reserved_slots(), total);
}

#[test]
fn orchestrator_slot_race_scenario() {
    // Orchestrator holds max_concurrent=3 with one spawned agent; two
    // dispatchers request 2 each — at most 2 granted in total.
    let db = Arc::new(Database::open_in_memory().unwrap());
    let manager = Arc::new(WorkflowStateManager::new(WorkflowStateStore::new(db)));
    manager
        .update_orchestration_lists(
            "orch",
            "w",
            OrchestrationUpdate {
                append_to_spawned: vec!["a1".to_string()],
                ..Default::default()
            },
        )
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..2 {
        let manager = Arc::clone(&manager);
        handles.push(std::thread::spawn(move || {
            manager.check_and_reserve_slots("orch", "w", 3, 2).unwrap()
        }));
    }
    let grants: Vec<u64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let total: u64 = grants.iter().sum();
    assert!(total <= 2, "granted {total} > 2");

    // Both spawn and release; spawned grows to 3, reservations drain.
    manager
        .update_orchestration_lists(
            "orch",
            "w",
            OrchestrationUpdate {
                append_to_spawned: vec!["a2".to_string(), "a3".to_string()],
                ..Default::default()
            },
        )
        .unwrap();
    manager.release_reserved_slots("orch", "w", total).unwrap();
    let state = manager.get("orch", "w").unwrap().unwrap();
    assert_eq!(state.reserved_slots(), 0);
    assert_eq!(state.spawned_agents().len(), 3);
}
