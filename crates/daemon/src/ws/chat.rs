// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket chat sessions
//!
//! Chat state is keyed by a stable `conversation_id` so it survives
//! disconnects; a background sweep evicts idle conversations. Replies
//! run through the LLM seam.

use crate::state::AppState;
use gobby_engine::LlmRequest;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Clone, Default)]
pub struct ChatSessions {
    inner: Arc<Mutex<HashMap<String, ChatSession>>>,
}

struct ChatSession {
    /// (role, content) turns, oldest first.
    history: Vec<(String, String)>,
    last_active: Instant,
    /// Set while a reply is being generated; `stop_chat` clears it.
    generating: bool,
    /// Answers to `ask_user` prompts, keyed by request id.
    pending_answers: HashMap<String, String>,
}

impl ChatSessions {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_session<T>(&self, conversation_id: &str, f: impl FnOnce(&mut ChatSession) -> T) -> T {
        let mut sessions = self.inner.lock();
        let session = sessions
            .entry(conversation_id.to_string())
            .or_insert_with(|| ChatSession {
                history: Vec::new(),
                last_active: Instant::now(),
                generating: false,
                pending_answers: HashMap::new(),
            });
        session.last_active = Instant::now();
        f(session)
    }

    /// Remove conversations idle beyond `timeout`. Called by the daemon
    /// housekeeping loop.
    pub fn evict_idle(&self, timeout: Duration) -> usize {
        let mut sessions = self.inner.lock();
        let before = sessions.len();
        sessions.retain(|_, s| s.last_active.elapsed() < timeout);
        before - sessions.len()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

pub(super) async fn handle_message(state: &AppState, request: &Value) -> Option<Value> {
    let conversation_id = request
        .get("conversation_id")
        .and_then(Value::as_str)
        .unwrap_or("default")
        .to_string();
    let content = request.get("content").and_then(Value::as_str)?.to_string();

    let Some(llm) = state.llm.as_ref() else {
        return Some(json!({
            "type": "error",
            "error_type": "not_configured",
            "message": "chat requires an LLM provider",
        }));
    };

    let history = state.chats.with_session(&conversation_id, |session| {
        session.generating = true;
        session.history.push(("user".to_string(), content.clone()));
        session.history.clone()
    });

    let prompt = history
        .iter()
        .map(|(role, text)| format!("{role}: {text}"))
        .collect::<Vec<_>>()
        .join("\n");
    let result = llm.complete(LlmRequest { prompt, ..Default::default() }).await;

    let reply = match result {
        Ok(value) => value
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| value.to_string()),
        Err(e) => {
            state.chats.with_session(&conversation_id, |s| s.generating = false);
            return Some(json!({
                "type": "error",
                "error_type": "chat_failed",
                "message": e,
            }));
        }
    };

    let interrupted = state.chats.with_session(&conversation_id, |session| {
        let interrupted = !session.generating;
        session.generating = false;
        if !interrupted {
            session.history.push(("assistant".to_string(), reply.clone()));
        }
        interrupted
    });
    if interrupted {
        return Some(json!({
            "type": "chat_stopped",
            "conversation_id": conversation_id,
        }));
    }
    Some(json!({
        "type": "chat_response",
        "conversation_id": conversation_id,
        "content": reply,
    }))
}

pub(super) fn handle_stop(state: &AppState, request: &Value) -> Option<Value> {
    let conversation_id = request
        .get("conversation_id")
        .and_then(Value::as_str)
        .unwrap_or("default");
    state.chats.with_session(conversation_id, |session| {
        session.generating = false;
    });
    Some(json!({"type": "chat_stopped", "conversation_id": conversation_id}))
}

pub(super) fn handle_ask_user_response(state: &AppState, request: &Value) -> Option<Value> {
    let conversation_id = request
        .get("conversation_id")
        .and_then(Value::as_str)
        .unwrap_or("default");
    let request_id = request.get("request_id").and_then(Value::as_str)?.to_string();
    let answer = request.get("answer").and_then(Value::as_str).unwrap_or("").to_string();
    state.chats.with_session(conversation_id, |session| {
        session.pending_answers.insert(request_id.clone(), answer);
    });
    Some(json!({"type": "ask_user_ack", "request_id": request_id}))
}

#[cfg(test)]
#[path = "chat_tests.rs"]
mod tests;
