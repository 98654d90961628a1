// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cron job management endpoints
//!
//! Backing for the `gobby cron` CLI. Schedules are validated here
//! (5-field cron or `300s`-style interval); `run` marks a job due so the
//! scheduler dispatches it on its next poll.

use super::ApiError;
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::Json;
use gobby_core::{utc_now_iso, CronActionType, CronJob, CronJobId, ScheduleType};
use gobby_engine::scheduler::stamp_next_run;
use gobby_workflow::{parse_schedule, ScheduleSpec};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
pub struct AddJobRequest {
    pub project_id: String,
    pub name: String,
    pub schedule: String,
    pub action_type: String,
    #[serde(default)]
    pub action_config: Value,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

fn apply_schedule(job: &mut CronJob, schedule: &str) -> Result<(), ApiError> {
    let spec = parse_schedule(schedule)
        .map_err(|e| ApiError::bad_request("validation_failed", e.to_string()))?;
    job.cron_expr = None;
    job.interval_seconds = None;
    job.run_at = None;
    match spec {
        ScheduleSpec::Cron(expr) => {
            job.schedule_type = ScheduleType::Cron;
            job.cron_expr = Some(expr);
        }
        ScheduleSpec::Interval(seconds) => {
            job.schedule_type = ScheduleType::Interval;
            job.interval_seconds = Some(seconds);
        }
    }
    Ok(())
}

pub async fn add(
    State(state): State<AppState>,
    Json(request): Json<AddJobRequest>,
) -> Result<Json<Value>, ApiError> {
    let action_type = CronActionType::parse(&request.action_type).ok_or_else(|| {
        ApiError::bad_request(
            "validation_failed",
            format!("unknown action type: {}", request.action_type),
        )
    })?;
    let now = utc_now_iso();
    let mut job = CronJob {
        id: CronJobId::new(),
        project_id: request.project_id,
        name: request.name,
        schedule_type: ScheduleType::Interval,
        cron_expr: None,
        interval_seconds: None,
        run_at: None,
        timezone: request.timezone.unwrap_or_else(|| "UTC".to_string()),
        action_type,
        action_config: request.action_config,
        enabled: true,
        next_run_at: None,
        last_run_at: None,
        last_status: None,
        consecutive_failures: 0,
        description: request.description,
        created_at: now.clone(),
        updated_at: now,
    };
    apply_schedule(&mut job, &request.schedule)?;
    stamp_next_run(&mut job);

    let crons = state.crons.clone();
    let stored = tokio::task::spawn_blocking(move || {
        crons.create(&job)?;
        crons.get(&job.id)
    })
    .await
    .map_err(|e| ApiError::internal(e.to_string()))??;
    Ok(Json(json!({ "job": stored })))
}

#[derive(Debug, Deserialize)]
pub struct JobRefQuery {
    #[serde(default)]
    pub project_id: Option<String>,
}

fn resolve_job(state: &AppState, reference: &str, project_id: Option<&str>) -> Result<CronJob, ApiError> {
    Ok(state.crons.resolve(reference, project_id.unwrap_or(""))?)
}

pub async fn get(
    State(state): State<AppState>,
    Path(reference): Path<String>,
    Query(query): Query<JobRefQuery>,
) -> Result<Json<Value>, ApiError> {
    let job = resolve_job(&state, &reference, query.project_id.as_deref())?;
    Ok(Json(json!({ "job": job })))
}

#[derive(Debug, Deserialize)]
pub struct EditJobRequest {
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub schedule: Option<String>,
    #[serde(default)]
    pub action_config: Option<Value>,
    #[serde(default)]
    pub description: Option<String>,
}

pub async fn edit(
    State(state): State<AppState>,
    Path(reference): Path<String>,
    Json(request): Json<EditJobRequest>,
) -> Result<Json<Value>, ApiError> {
    let mut job = resolve_job(&state, &reference, request.project_id.as_deref())?;
    if let Some(schedule) = &request.schedule {
        apply_schedule(&mut job, schedule)?;
    }
    if let Some(action_config) = request.action_config {
        job.action_config = action_config;
    }
    if let Some(description) = request.description {
        job.description = Some(description);
    }
    // Edits revalidate the schedule invariant and recompute next fire.
    stamp_next_run(&mut job);
    let crons = state.crons.clone();
    let updated = tokio::task::spawn_blocking(move || {
        crons.update(&job)?;
        crons.get(&job.id)
    })
    .await
    .map_err(|e| ApiError::internal(e.to_string()))??;
    Ok(Json(json!({ "job": updated })))
}

pub async fn toggle(
    State(state): State<AppState>,
    Path(reference): Path<String>,
    Query(query): Query<JobRefQuery>,
) -> Result<Json<Value>, ApiError> {
    let mut job = resolve_job(&state, &reference, query.project_id.as_deref())?;
    job.enabled = !job.enabled;
    stamp_next_run(&mut job);
    let crons = state.crons.clone();
    let updated = tokio::task::spawn_blocking(move || {
        crons.update(&job)?;
        crons.get(&job.id)
    })
    .await
    .map_err(|e| ApiError::internal(e.to_string()))??;
    Ok(Json(json!({ "job": updated })))
}

/// Mark a job due immediately; the scheduler dispatches on its next
/// poll.
pub async fn run_now(
    State(state): State<AppState>,
    Path(reference): Path<String>,
    Query(query): Query<JobRefQuery>,
) -> Result<Json<Value>, ApiError> {
    let mut job = resolve_job(&state, &reference, query.project_id.as_deref())?;
    if !job.enabled {
        return Err(ApiError::bad_request("validation_failed", "job is disabled"));
    }
    job.next_run_at = Some(utc_now_iso());
    let crons = state.crons.clone();
    tokio::task::spawn_blocking(move || crons.update(&job))
        .await
        .map_err(|e| ApiError::internal(e.to_string()))??;
    Ok(Json(json!({ "queued": true })))
}

pub async fn remove(
    State(state): State<AppState>,
    Path(reference): Path<String>,
    Query(query): Query<JobRefQuery>,
) -> Result<Json<Value>, ApiError> {
    let job = resolve_job(&state, &reference, query.project_id.as_deref())?;
    let crons = state.crons.clone();
    tokio::task::spawn_blocking(move || crons.delete(&job.id))
        .await
        .map_err(|e| ApiError::internal(e.to_string()))??;
    Ok(Json(json!({ "removed": true })))
}

pub async fn runs(
    State(state): State<AppState>,
    Path(reference): Path<String>,
    Query(query): Query<JobRefQuery>,
) -> Result<Json<Value>, ApiError> {
    let job = resolve_job(&state, &reference, query.project_id.as_deref())?;
    let crons = state.crons.clone();
    let rows = tokio::task::spawn_blocking(move || crons.list_runs(&job.id, 50))
        .await
        .map_err(|e| ApiError::internal(e.to_string()))??;
    Ok(Json(json!({ "runs": rows })))
}

#[cfg(test)]
#[path = "crons_tests.rs"]
mod tests;
