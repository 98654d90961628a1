// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pipeline endpoints
//!
//! `run` returns 200 on terminal success, 202 with the resume token when
//! an approval gate fires, 404 for unknown pipelines. `approve` resumes
//! by token: 200 on terminal, 202 when another gate is pending, 404 for
//! a consumed or unknown token.

use super::ApiError;
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use gobby_core::PipelineExecutionId;
use gobby_engine::EngineError;
use serde::Deserialize;
use serde_json::{json, Map, Value};

#[derive(Debug, Deserialize)]
pub struct RunRequest {
    pub name: String,
    #[serde(default)]
    pub inputs: Map<String, Value>,
    #[serde(default)]
    pub project_id: Option<String>,
}

pub async fn run(
    State(state): State<AppState>,
    Json(request): Json<RunRequest>,
) -> Result<Response, ApiError> {
    let result = state
        .pipelines
        .run(&request.name, request.inputs, request.project_id.as_deref(), None)
        .await;
    render_outcome(result)
}

#[derive(Debug, Deserialize)]
pub struct ApproveQuery {
    #[serde(default)]
    pub approved_by: Option<String>,
}

pub async fn approve(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Query(query): Query<ApproveQuery>,
) -> Result<Response, ApiError> {
    let result = state.pipelines.approve(&token, query.approved_by.as_deref()).await;
    render_outcome(result)
}

fn render_outcome(
    result: Result<gobby_core::PipelineExecution, EngineError>,
) -> Result<Response, ApiError> {
    match result {
        Ok(execution) => {
            let outputs: Value = execution
                .outputs_json
                .as_deref()
                .and_then(|text| serde_json::from_str(text).ok())
                .unwrap_or(Value::Null);
            Ok(Json(json!({
                "status": execution.status.as_str(),
                "execution_id": execution.id.as_str(),
                "outputs": outputs,
            }))
            .into_response())
        }
        Err(EngineError::ApprovalRequired { execution_id, step_id, token, message }) => Ok((
            StatusCode::ACCEPTED,
            Json(json!({
                "status": "waiting_approval",
                "execution_id": execution_id.as_str(),
                "step_id": step_id,
                "token": token,
                "message": message,
            })),
        )
            .into_response()),
        Err(e) => Err(e.into()),
    }
}

pub async fn get_execution(
    State(state): State<AppState>,
    Path(execution_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = PipelineExecutionId::from_string(execution_id);
    let store = state.pipeline_store.clone();
    let (execution, steps) = tokio::task::spawn_blocking(move || {
        let execution = store.get_execution(&id)?;
        let steps = store.list_steps(&id)?;
        Ok::<_, gobby_storage::StorageError>((execution, steps))
    })
    .await
    .map_err(|e| ApiError::internal(e.to_string()))??;

    let steps: Vec<Value> = steps
        .iter()
        .map(|s| {
            json!({
                "step_id": s.step_id,
                "status": s.status.as_str(),
                "started_at": s.started_at,
                "completed_at": s.completed_at,
                "output_json": s.output_json,
                "error": s.error,
                "approved_by": s.approved_by,
            })
        })
        .collect();
    Ok(Json(json!({
        "id": execution.id.as_str(),
        "pipeline_name": execution.pipeline_name,
        "status": execution.status.as_str(),
        "inputs_json": execution.inputs_json,
        "outputs_json": execution.outputs_json,
        "created_at": execution.created_at,
        "completed_at": execution.completed_at,
        "steps": steps,
    })))
}
