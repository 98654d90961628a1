// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket server
//!
//! JSON messages with a `type` field, dispatched to sub-services: event
//! subscriptions, MCP tool calls, agent stop requests, terminal input,
//! chat, and tmux control. Voice types answer with a structured
//! `not_enabled` error (the STT/TTS engines are external services).
//!
//! Broadcast filtering: a client's subscription set filters `hook_event`
//! messages by `event_type`; system messages (no event type) are always
//! delivered.

pub mod chat;
pub mod tmux;

use crate::state::AppState;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use gobby_core::AgentRunId;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashSet;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    #[serde(default)]
    pub token: Option<String>,
}

/// Handshake: optional token validation; local-first mode (no configured
/// token) accepts every connection.
pub async fn upgrade(
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    if let Some(expected) = &state.auth_token {
        if query.token.as_deref() != Some(expected.as_str()) {
            return axum::http::StatusCode::UNAUTHORIZED.into_response();
        }
    }
    ws.on_upgrade(move |socket| client_loop(state, socket))
}

/// Per-connection state.
struct Client {
    /// Event-type filters; `*` subscribes to everything.
    subscriptions: HashSet<String>,
}

impl Client {
    fn wants(&self, event_type: Option<&str>) -> bool {
        match event_type {
            // System messages are unconditionally delivered.
            None => true,
            Some(event_type) => {
                self.subscriptions.contains("*") || self.subscriptions.contains(event_type)
            }
        }
    }
}

async fn client_loop(state: AppState, socket: WebSocket) {
    let (mut sink, mut stream) = socket.split();
    let mut broadcast = state.broadcaster.subscribe();
    let mut client = Client { subscriptions: HashSet::new() };

    loop {
        tokio::select! {
            incoming = stream.next() => {
                let Some(Ok(message)) = incoming else {
                    break;
                };
                let Message::Text(text) = message else {
                    continue;
                };
                let Ok(request) = serde_json::from_str::<Value>(&text) else {
                    let _ = send(&mut sink, error_reply("malformed", "invalid JSON")).await;
                    continue;
                };
                let reply = dispatch(&state, &mut client, &request).await;
                if let Some(reply) = reply {
                    if send(&mut sink, reply).await.is_err() {
                        break;
                    }
                }
            }
            published = broadcast.recv() => {
                match published {
                    Ok(message) => {
                        if client.wants(message.event_type.as_deref())
                            && send(&mut sink, message.payload).await.is_err()
                        {
                            break;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "websocket client lagged");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }
}

async fn send(sink: &mut SplitSink<WebSocket, Message>, payload: Value) -> Result<(), ()> {
    let text = payload.to_string();
    sink.send(Message::Text(text.into())).await.map_err(|_| ())
}

fn error_reply(kind: &str, message: &str) -> Value {
    json!({"type": "error", "error_type": kind, "message": message})
}

/// Message dispatch by `type`.
async fn dispatch(state: &AppState, client: &mut Client, request: &Value) -> Option<Value> {
    let message_type = request.get("type").and_then(Value::as_str).unwrap_or("");
    match message_type {
        "ping" => Some(json!({"type": "pong"})),

        "subscribe" => {
            for event in event_list(request) {
                client.subscriptions.insert(event);
            }
            Some(json!({"type": "subscribed", "subscriptions": client.subscriptions}))
        }
        "unsubscribe" => {
            for event in event_list(request) {
                client.subscriptions.remove(&event);
            }
            Some(json!({"type": "unsubscribed", "subscriptions": client.subscriptions}))
        }

        "tool_call" => {
            let server = request.get("server").and_then(Value::as_str).unwrap_or("gobby");
            let tool = request.get("tool").and_then(Value::as_str)?;
            let args = request.get("args").cloned().unwrap_or(json!({}));
            let Some(proxy) = state.tool_proxy.as_ref() else {
                return Some(error_reply("not_configured", "no MCP proxy configured"));
            };
            match proxy.call_tool(server, tool, args).await {
                Ok(result) => Some(json!({"type": "tool_result", "tool": tool, "result": result})),
                Err(e) => Some(error_reply("tool_failed", &e)),
            }
        }

        "stop_request" => {
            let run_id = request.get("run_id").and_then(Value::as_str)?;
            let run_id = AgentRunId::from_string(run_id);
            state.runner.finish(&run_id, "cancelled", Some("stop_request"));
            Some(json!({"type": "stopped", "run_id": run_id.as_str()}))
        }

        "terminal_input" => {
            let terminal_id = request.get("terminal_id").and_then(Value::as_str)?;
            let input = request.get("input").and_then(Value::as_str).unwrap_or("");
            match state.terminal.send(terminal_id, input).await {
                Ok(()) => Some(json!({"type": "terminal_ack", "terminal_id": terminal_id})),
                Err(e) => Some(error_reply("terminal_failed", &e.to_string())),
            }
        }

        "chat_message" => chat::handle_message(state, request).await,
        "stop_chat" => chat::handle_stop(state, request),
        "ask_user_response" => chat::handle_ask_user_response(state, request),

        t if t.starts_with("tmux_") => tmux::handle(state, t, request).await,

        t if t.starts_with("voice_") => {
            // Voice is config-gated and external; absent config answers
            // with a structured error instead of dropping the message.
            Some(error_reply("not_enabled", "voice subsystem is not configured"))
        }

        other => Some(error_reply("unknown_type", &format!("unknown message type: {other}"))),
    }
}

fn event_list(request: &Value) -> Vec<String> {
    match request.get("events") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        Some(Value::String(one)) => vec![one.clone()],
        _ => vec!["*".to_string()],
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
