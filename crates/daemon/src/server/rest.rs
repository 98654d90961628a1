// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! REST over sessions, tasks, agents, memories, cron jobs

use super::ApiError;
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::Json;
use gobby_core::{AgentMode, IsolationMode};
use gobby_engine::SpawnRequest;
use serde::Deserialize;
use serde_json::{json, Value};

/// Run a blocking storage closure off the event loop.
async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, gobby_storage::StorageError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?
        .map_err(ApiError::from)
}

pub async fn status(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "uptime_seconds": state.start_time.elapsed().as_secs(),
        "running_agents": state.registry.count(),
        "adapters": state.adapters.names(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    100
}

pub async fn list_sessions(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>, ApiError> {
    let sessions = state.sessions.clone();
    let rows = blocking(move || match &query.project_id {
        Some(project_id) => sessions.list_by_project(project_id),
        None => sessions.list_all(query.limit),
    })
    .await?;
    Ok(Json(json!({ "sessions": rows })))
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let sessions = state.sessions.clone();
    let session = blocking(move || sessions.get(&id)).await?;
    Ok(Json(json!({ "session": session })))
}

pub async fn list_tasks(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>, ApiError> {
    let project_id = query
        .project_id
        .clone()
        .ok_or_else(|| ApiError::bad_request("validation_failed", "project_id is required"))?;
    let status = query.status.as_deref().and_then(gobby_core::TaskStatus::parse);
    let tasks = state.tasks.clone();
    let rows = blocking(move || tasks.list_by_project(&project_id, status)).await?;
    Ok(Json(json!({ "tasks": rows })))
}

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub project_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parent_task_id: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
}

pub async fn create_task(
    State(state): State<AppState>,
    Json(request): Json<CreateTaskRequest>,
) -> Result<Json<Value>, ApiError> {
    let tasks = state.tasks.clone();
    let task = blocking(move || {
        tasks.create(
            &request.project_id,
            gobby_storage::tasks::NewTask {
                title: request.title,
                description: request.description,
                parent_task_id: request.parent_task_id,
                priority: request.priority,
                ..Default::default()
            },
        )
    })
    .await?;
    Ok(Json(json!({ "task": task })))
}

#[derive(Debug, Deserialize)]
pub struct TaskRefQuery {
    pub project_id: String,
}

pub async fn get_task(
    State(state): State<AppState>,
    Path(reference): Path<String>,
    Query(query): Query<TaskRefQuery>,
) -> Result<Json<Value>, ApiError> {
    let tasks = state.tasks.clone();
    let task =
        blocking(move || tasks.resolve_task_reference(&reference, &query.project_id)).await?;
    let deps = {
        let tasks = state.tasks.clone();
        let id = task.id.clone();
        blocking(move || tasks.dependencies_of(&id)).await?
    };
    Ok(Json(json!({ "task": task, "dependencies": deps })))
}

#[derive(Debug, Deserialize)]
pub struct CloseTaskRequest {
    pub project_id: String,
    #[serde(default)]
    pub no_commit_needed: bool,
    #[serde(default)]
    pub uncommitted_tracked_changes: bool,
}

pub async fn close_task(
    State(state): State<AppState>,
    Path(reference): Path<String>,
    Json(request): Json<CloseTaskRequest>,
) -> Result<Json<Value>, ApiError> {
    let tasks = state.tasks.clone();
    let task = blocking(move || {
        let task = tasks.resolve_task_reference(&reference, &request.project_id)?;
        tasks.close(
            &task.id,
            gobby_storage::CloseOptions {
                no_commit_needed: request.no_commit_needed,
                uncommitted_tracked_changes: request.uncommitted_tracked_changes,
            },
        )
    })
    .await?;
    Ok(Json(json!({ "task": task })))
}

pub async fn list_agents(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let live: Vec<Value> = state
        .registry
        .list_all()
        .iter()
        .map(|a| serde_json::to_value(a).unwrap_or(Value::Null))
        .collect();
    let history_store = state.agent_history.clone();
    let history = blocking(move || history_store.list_recent(50)).await?;
    Ok(Json(json!({ "running": live, "recent": history })))
}

#[derive(Debug, Deserialize)]
pub struct SpawnAgentRequest {
    pub agent: String,
    pub parent_session_id: String,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub workflow: Option<String>,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub isolation: Option<String>,
}

pub async fn spawn_agent(
    State(state): State<AppState>,
    Json(request): Json<SpawnAgentRequest>,
) -> Result<Json<Value>, ApiError> {
    let result = state
        .runner
        .spawn(SpawnRequest {
            agent: request.agent,
            prompt: request.prompt,
            workflow: request.workflow,
            parent_session_id: request.parent_session_id,
            mode: request.mode.as_deref().and_then(AgentMode::parse),
            provider: request.provider,
            isolation: request.isolation.as_deref().and_then(IsolationMode::parse),
            ..Default::default()
        })
        .await?;
    Ok(Json(json!({ "spawned": result })))
}

/// Dry-run spawn check; refusals carry `SPAWN_DEPTH_EXCEEDED`.
pub async fn can_spawn(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let (allowed, reason, current_depth) = state.runner.can_spawn(&session_id)?;
    Ok(Json(json!({
        "can_spawn": allowed,
        "reason": if reason.is_empty() { Value::Null } else { json!(reason) },
        "current_depth": current_depth,
    })))
}

pub async fn list_memories(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>, ApiError> {
    let project_id = query
        .project_id
        .clone()
        .ok_or_else(|| ApiError::bad_request("validation_failed", "project_id is required"))?;
    let memories = state.memories.clone();
    let rows = blocking(move || memories.list_by_project(&project_id, query.limit)).await?;
    Ok(Json(json!({ "memories": rows })))
}

#[derive(Debug, Deserialize)]
pub struct CreateMemoryRequest {
    pub project_id: String,
    pub content: String,
    #[serde(default)]
    pub memory_type: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

pub async fn create_memory(
    State(state): State<AppState>,
    Json(request): Json<CreateMemoryRequest>,
) -> Result<Json<Value>, ApiError> {
    let memories = state.memories.clone();
    let memory = blocking(move || {
        memories.save(
            &request.project_id,
            &request.content,
            request.memory_type.as_deref().unwrap_or("fact"),
            "manual",
            None,
            &request.tags,
        )
    })
    .await?;
    Ok(Json(json!({ "memory": memory })))
}

pub async fn list_cron_jobs(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>, ApiError> {
    let store = state.crons.clone();
    let rows = blocking(move || store.list(query.project_id.as_deref())).await?;
    Ok(Json(json!({ "jobs": rows })))
}
