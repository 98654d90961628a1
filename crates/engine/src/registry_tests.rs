// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use gobby_core::{utc_now_iso, AgentMode};
use parking_lot::Mutex as PlMutex;

fn agent(parent: &str) -> RunningAgent {
    RunningAgent {
        run_id: AgentRunId::new(),
        session_id: gobby_core::new_uuid(),
        parent_session_id: parent.to_string(),
        mode: AgentMode::Headless,
        started_at: utc_now_iso(),
        pid: None,
        master_fd: None,
        terminal_type: None,
        provider: "claude".to_string(),
        workflow_name: None,
        worktree_id: None,
    }
}

#[test]
fn add_get_remove_round_trip() {
    let registry = RunningAgentRegistry::new();
    let a = agent("parent-1");
    let run_id = a.run_id.clone();
    registry.add(a);
    assert!(registry.get(&run_id).is_some());
    assert_eq!(registry.count(), 1);

    let removed = registry.remove(&run_id, "completed").unwrap();
    assert_eq!(removed.run_id, run_id);
    assert!(registry.get(&run_id).is_none());
    assert!(registry.remove(&run_id, "completed").is_none());
}

#[test]
fn lookups_by_session_pid_parent_mode() {
    let registry = RunningAgentRegistry::new();
    let mut a = agent("parent-1");
    a.pid = Some(4242);
    a.mode = AgentMode::Terminal;
    let session_id = a.session_id.clone();
    registry.add(a);
    registry.add(agent("parent-2"));

    assert!(registry.get_by_session(&session_id).is_some());
    assert!(registry.get_by_pid(4242).is_some());
    assert!(registry.get_by_pid(999).is_none());
    assert_eq!(registry.list_by_parent("parent-1").len(), 1);
    assert_eq!(registry.list_by_mode(AgentMode::Terminal).len(), 1);
    assert_eq!(registry.count_by_parent("parent-2"), 1);
    assert_eq!(registry.list_all().len(), 2);
}

#[test]
fn callbacks_fire_with_status_suffix() {
    let registry = RunningAgentRegistry::new();
    let seen: std::sync::Arc<PlMutex<Vec<String>>> = Default::default();
    let sink = std::sync::Arc::clone(&seen);
    registry.add_event_callback(std::sync::Arc::new(move |event_type, _, _| {
        sink.lock().push(event_type.to_string());
        Ok(())
    }));

    let a = agent("p");
    let run_id = a.run_id.clone();
    registry.add(a);
    registry.remove(&run_id, "failed");

    let events = seen.lock().clone();
    assert_eq!(events, vec!["agent_started", "agent_failed"]);
}

#[test]
fn callback_errors_are_swallowed() {
    let registry = RunningAgentRegistry::new();
    registry.add_event_callback(std::sync::Arc::new(|_, _, _| Err("boom".to_string())));
    // No panic, state still mutates.
    let a = agent("p");
    let run_id = a.run_id.clone();
    registry.add(a);
    assert!(registry.get(&run_id).is_some());
}

#[test]
fn callback_may_reenter_registry() {
    // The callback runs outside the state lock, so a reentrant read
    // must not deadlock.
    let registry = std::sync::Arc::new(RunningAgentRegistry::new());
    let inner = std::sync::Arc::clone(&registry);
    registry.add_event_callback(std::sync::Arc::new(move |_, run_id, _| {
        let _ = inner.get(run_id);
        Ok(())
    }));
    registry.add(agent("p"));
    assert_eq!(registry.count(), 1);
}

#[test]
fn cleanup_by_pids_removes_only_dead() {
    let registry = RunningAgentRegistry::new();
    let mut dead = agent("p");
    dead.pid = Some(111);
    let mut alive = agent("p");
    alive.pid = Some(222);
    registry.add(dead);
    registry.add(alive);

    let removed = registry.cleanup_by_pids(&[111]);
    assert_eq!(removed.len(), 1);
    assert_eq!(removed[0].pid, Some(111));
    assert_eq!(registry.count(), 1);
}

#[test]
fn cleanup_stale_emits_timeout() {
    let registry = RunningAgentRegistry::new();
    let seen: std::sync::Arc<PlMutex<Vec<String>>> = Default::default();
    let sink = std::sync::Arc::clone(&seen);
    registry.add_event_callback(std::sync::Arc::new(move |event_type, _, _| {
        sink.lock().push(event_type.to_string());
        Ok(())
    }));

    let mut old = agent("p");
    old.started_at = "2020-01-01T00:00:00Z".to_string();
    registry.add(old);
    registry.add(agent("p"));

    let removed = registry.cleanup_stale(3600, chrono::Utc::now());
    assert_eq!(removed.len(), 1);
    assert_eq!(registry.count(), 1);
    assert!(seen.lock().iter().any(|e| e == "agent_timeout"));
}

#[test]
fn clear_empties_everything() {
    let registry = RunningAgentRegistry::new();
    registry.add(agent("p"));
    registry.add(agent("p"));
    assert_eq!(registry.clear(), 2);
    assert_eq!(registry.count(), 0);
}
