// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hook ingest
//!
//! `POST /hooks/<adapter>`: the body is the CLI's native payload, the
//! response is the CLI's native shape. Unknown adapters are 400;
//! translation failures fail open inside the adapter.

use super::ApiError;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::Json;
use serde_json::Value;

pub async fn ingest(
    State(state): State<AppState>,
    Path(adapter): Path<String>,
    Json(native): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let adapter = state
        .adapters
        .get(&adapter)
        .map_err(|e| ApiError::bad_request("validation_failed", e.to_string()))?;
    let handler: &dyn gobby_adapters::HookHandler = state.hooks.as_ref();
    let out = adapter.handle_native(native, handler).await;
    Ok(Json(out))
}
