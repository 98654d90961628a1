// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::Database;

fn store() -> PipelineStore {
    PipelineStore::new(Arc::new(Database::open_in_memory().unwrap()))
}

#[test]
fn create_execution_starts_pending() {
    let store = store();
    let exec = store
        .create_execution("build", Some("p1"), Some("{\"x\":1}"), None, None)
        .unwrap();
    assert!(exec.id.as_str().starts_with("pe-"));
    assert_eq!(exec.status, PipelineStatus::Pending);
    assert_eq!(exec.inputs_json.as_deref(), Some("{\"x\":1}"));
    assert!(exec.completed_at.is_none());
}

#[test]
fn status_transition_stamps_completed_at_on_terminal() {
    let store = store();
    let exec = store.create_execution("build", None, None, None, None).unwrap();
    store.set_execution_status(&exec.id, PipelineStatus::Running).unwrap();
    assert!(store.get_execution(&exec.id).unwrap().completed_at.is_none());
    store.set_execution_status(&exec.id, PipelineStatus::Completed).unwrap();
    let done = store.get_execution(&exec.id).unwrap();
    assert_eq!(done.status, PipelineStatus::Completed);
    assert!(done.completed_at.is_some());
}

#[test]
fn resume_token_lookup_round_trip() {
    let store = store();
    let exec = store.create_execution("deploy", None, None, None, None).unwrap();
    store.set_resume_token(&exec.id, Some("tok-1")).unwrap();
    let found = store.find_by_token("tok-1").unwrap().unwrap();
    assert_eq!(found.id, exec.id);
    store.set_resume_token(&exec.id, None).unwrap();
    assert!(store.find_by_token("tok-1").unwrap().is_none());
}

#[test]
fn child_execution_links_parent() {
    let store = store();
    let parent = store.create_execution("outer", None, None, None, None).unwrap();
    let child = store
        .create_execution("inner", None, None, None, Some(&parent.id))
        .unwrap();
    assert_eq!(child.parent_execution_id, Some(parent.id));
}

#[test]
fn steps_lifecycle() {
    let store = store();
    let exec = store.create_execution("build", None, None, None, None).unwrap();
    store.create_step(&exec.id, "compile", None).unwrap();
    store.create_step(&exec.id, "test", None).unwrap();
    store.mark_step_running(&exec.id, "compile").unwrap();
    store
        .finish_step(
            &exec.id,
            "compile",
            StepExecutionStatus::Completed,
            Some("{\"exit_code\":0}"),
            None,
        )
        .unwrap();

    let steps = store.list_steps(&exec.id).unwrap();
    assert_eq!(steps.len(), 2);
    assert_eq!(steps[0].step_id, "compile");
    assert_eq!(steps[0].status, StepExecutionStatus::Completed);
    assert!(steps[0].started_at.is_some());
    assert!(steps[0].completed_at.is_some());
    assert_eq!(steps[1].status, StepExecutionStatus::Pending);
}

#[test]
fn waiting_step_approval_flow() {
    let store = store();
    let exec = store.create_execution("deploy", None, None, None, None).unwrap();
    store.create_step(&exec.id, "gate", None).unwrap();
    store.set_step_waiting_approval(&exec.id, "gate", "tok-9").unwrap();

    let waiting = store.find_waiting_step(&exec.id).unwrap().unwrap();
    assert_eq!(waiting.step_id, "gate");
    assert_eq!(waiting.approval_token.as_deref(), Some("tok-9"));

    store.record_step_approval(&exec.id, "gate", Some("alice")).unwrap();
    let approved = store.get_step(&exec.id, "gate").unwrap();
    assert_eq!(approved.approved_by.as_deref(), Some("alice"));
    assert!(approved.approval_token.is_none());
    assert!(approved.approved_at.is_some());
}

#[test]
fn get_unknown_execution_is_not_found() {
    let store = store();
    let err = store
        .get_execution(&PipelineExecutionId::from_string("pe-missing"))
        .unwrap_err();
    assert_eq!(err.kind(), "not_found");
}
