// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tmux control messages
//!
//! `tmux_list`, `tmux_create`, `tmux_send`, `tmux_kill`, `tmux_attach`.
//! Everything routes through the session adapter so tests run against
//! the fake.

use crate::state::AppState;
use serde_json::{json, Value};
use std::path::PathBuf;

pub(super) async fn handle(
    state: &AppState,
    message_type: &str,
    request: &Value,
) -> Option<Value> {
    match message_type {
        "tmux_list" => match state.terminal.list().await {
            Ok(sessions) => Some(json!({"type": "tmux_sessions", "sessions": sessions})),
            Err(e) => Some(error(&e.to_string())),
        },
        "tmux_create" => {
            let name = request.get("name").and_then(Value::as_str)?;
            let cwd = request
                .get("cwd")
                .and_then(Value::as_str)
                .map(PathBuf::from)
                .unwrap_or_else(|| std::env::temp_dir());
            let command = request
                .get("command")
                .and_then(Value::as_str)
                .unwrap_or("$SHELL");
            match state.terminal.spawn(name, &cwd, command, &[]).await {
                Ok(id) => Some(json!({"type": "tmux_created", "session_id": id})),
                Err(e) => Some(error(&e.to_string())),
            }
        }
        "tmux_send" => {
            let session_id = request.get("session_id").and_then(Value::as_str)?;
            let input = request.get("input").and_then(Value::as_str).unwrap_or("");
            match state.terminal.send(session_id, input).await {
                Ok(()) => Some(json!({"type": "tmux_ack", "session_id": session_id})),
                Err(e) => Some(error(&e.to_string())),
            }
        }
        "tmux_kill" => {
            let session_id = request.get("session_id").and_then(Value::as_str)?;
            match state.terminal.kill(session_id).await {
                Ok(()) => Some(json!({"type": "tmux_killed", "session_id": session_id})),
                Err(e) => Some(error(&e.to_string())),
            }
        }
        "tmux_attach" | "tmux_detach" => {
            // Attach semantics need a client-side pty bridge; the server
            // answers with the session's liveness.
            let session_id = request.get("session_id").and_then(Value::as_str)?;
            let running = state.terminal.is_running(session_id).await;
            Some(json!({
                "type": "tmux_status",
                "session_id": session_id,
                "running": running,
            }))
        }
        "tmux_resize" => {
            let session_id = request.get("session_id").and_then(Value::as_str)?;
            Some(json!({"type": "tmux_ack", "session_id": session_id}))
        }
        other => Some(error(&format!("unknown tmux message: {other}"))),
    }
}

fn error(message: &str) -> Value {
    json!({"type": "error", "error_type": "tmux_failed", "message": message})
}
