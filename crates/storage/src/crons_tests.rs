// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::Database;
use gobby_core::utc_now_iso;

fn store() -> CronStore {
    CronStore::new(Arc::new(Database::open_in_memory().unwrap()))
}

fn job(name: &str) -> CronJob {
    let now = utc_now_iso();
    CronJob {
        id: CronJobId::new(),
        project_id: "p1".to_string(),
        name: name.to_string(),
        schedule_type: ScheduleType::Cron,
        cron_expr: Some("0 7 * * *".to_string()),
        interval_seconds: None,
        run_at: None,
        timezone: "UTC".to_string(),
        action_type: CronActionType::Shell,
        action_config: serde_json::json!({"command": "echo"}),
        enabled: true,
        next_run_at: None,
        last_run_at: None,
        last_status: None,
        consecutive_failures: 0,
        description: None,
        created_at: now.clone(),
        updated_at: now,
    }
}

#[test]
fn create_and_get_round_trip() {
    let store = store();
    let j = job("nightly");
    store.create(&j).unwrap();
    let loaded = store.get(&j.id).unwrap();
    assert_eq!(loaded.name, "nightly");
    assert_eq!(loaded.cron_expr.as_deref(), Some("0 7 * * *"));
    assert_eq!(loaded.action_config, serde_json::json!({"command": "echo"}));
}

#[test]
fn create_rejects_invalid_schedule() {
    let store = store();
    let mut j = job("bad");
    j.interval_seconds = Some(60);
    assert_eq!(store.create(&j).unwrap_err().kind(), "validation_failed");
}

#[test]
fn resolve_by_name_or_id() {
    let store = store();
    let j = job("nightly");
    store.create(&j).unwrap();
    assert_eq!(store.resolve("nightly", "p1").unwrap().id, j.id);
    assert_eq!(store.resolve(j.id.as_str(), "p1").unwrap().id, j.id);
    assert_eq!(store.resolve("missing", "p1").unwrap_err().kind(), "not_found");
}

#[test]
fn update_edits_schedule() {
    let store = store();
    let mut j = job("nightly");
    store.create(&j).unwrap();
    j.cron_expr = Some("30 8 * * *".to_string());
    store.update(&j).unwrap();
    assert_eq!(store.get(&j.id).unwrap().cron_expr.as_deref(), Some("30 8 * * *"));
}

#[test]
fn due_jobs_filters_enabled_and_time() {
    let store = store();
    let mut due = job("due");
    due.next_run_at = Some("2020-01-01T00:00:00Z".to_string());
    store.create(&due).unwrap();

    let mut future = job("future");
    future.next_run_at = Some("2999-01-01T00:00:00Z".to_string());
    store.create(&future).unwrap();

    let mut disabled = job("disabled");
    disabled.enabled = false;
    disabled.next_run_at = Some("2020-01-01T00:00:00Z".to_string());
    store.create(&disabled).unwrap();

    let due_now = store.due_jobs(&utc_now_iso()).unwrap();
    assert_eq!(due_now.len(), 1);
    assert_eq!(due_now[0].name, "due");
}

#[test]
fn run_lifecycle_and_concurrency_count() {
    let store = store();
    let j = job("nightly");
    store.create(&j).unwrap();

    let run = store.create_run(&j.id).unwrap();
    assert_eq!(run.status, CronRunStatus::Pending);
    assert_eq!(store.count_running().unwrap(), 1);

    store.mark_run_started(&run.id).unwrap();
    assert_eq!(store.count_running().unwrap(), 1);

    store
        .finish_run(&run.id, CronRunStatus::Completed, Some("ok"), None, None, None)
        .unwrap();
    assert_eq!(store.count_running().unwrap(), 0);

    let runs = store.list_runs(&j.id, 10).unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].output.as_deref(), Some("ok"));
}

#[test]
fn cleanup_old_runs_respects_cutoff_and_status() {
    let store = store();
    let j = job("nightly");
    store.create(&j).unwrap();
    let run = store.create_run(&j.id).unwrap();
    store
        .finish_run(&run.id, CronRunStatus::Completed, None, None, None, None)
        .unwrap();
    // Cutoff far in the future deletes the completed run.
    let deleted = store.cleanup_old_runs("2999-01-01T00:00:00Z").unwrap();
    assert_eq!(deleted, 1);
}

#[test]
fn delete_removes_job_and_runs() {
    let store = store();
    let j = job("nightly");
    store.create(&j).unwrap();
    store.create_run(&j.id).unwrap();
    store.delete(&j.id).unwrap();
    assert_eq!(store.get(&j.id).unwrap_err().kind(), "not_found");
    assert_eq!(store.delete(&j.id).unwrap_err().kind(), "not_found");
}
