// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! MCP proxy passthrough
//!
//! The core consumes MCP only through the `ToolProxy` seam; these
//! endpoints expose it to CLI tooling. Absent a configured proxy they
//! answer with a structured not-configured error.

use super::ApiError;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::Json;
use serde_json::{json, Value};

pub async fn list_servers(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let Some(proxy) = state.tool_proxy.as_ref() else {
        return Ok(Json(json!({ "servers": [], "proxy_configured": false })));
    };
    // Server inventory rides through the proxy's own discovery tool.
    let result = proxy
        .call_tool("gobby", "list_mcp_servers", json!({}))
        .await
        .map_err(ApiError::internal)?;
    Ok(Json(json!({ "servers": result, "proxy_configured": true })))
}

pub async fn call_tool(
    State(state): State<AppState>,
    Path((server, tool)): Path<(String, String)>,
    Json(args): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let proxy = state
        .tool_proxy
        .as_ref()
        .ok_or_else(|| ApiError::bad_request("validation_failed", "no MCP proxy configured"))?;
    let result = proxy
        .call_tool(&server, &tool, args)
        .await
        .map_err(ApiError::internal)?;
    Ok(Json(json!({ "result": result })))
}
