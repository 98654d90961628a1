// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::TestDaemon;
use serde_json::json;

#[tokio::test]
async fn conversation_persists_across_messages() {
    let daemon = TestDaemon::new();
    *daemon.llm.response.lock() = json!("reply");
    handle_message(
        &daemon.state,
        &json!({"type": "chat_message", "conversation_id": "cv-1", "content": "first"}),
    )
    .await
    .unwrap();
    handle_message(
        &daemon.state,
        &json!({"type": "chat_message", "conversation_id": "cv-1", "content": "second"}),
    )
    .await
    .unwrap();

    // The second prompt carries the whole history.
    let prompts = daemon.llm.prompts.lock();
    assert!(prompts[1].contains("first"));
    assert!(prompts[1].contains("second"));
    assert!(prompts[1].contains("assistant: reply"));
    assert_eq!(daemon.state.chats.len(), 1);
}

#[tokio::test]
async fn separate_conversations_are_isolated() {
    let daemon = TestDaemon::new();
    *daemon.llm.response.lock() = json!("r");
    for cv in ["a", "b"] {
        handle_message(
            &daemon.state,
            &json!({"type": "chat_message", "conversation_id": cv, "content": "hi"}),
        )
        .await
        .unwrap();
    }
    assert_eq!(daemon.state.chats.len(), 2);
}

#[tokio::test]
async fn llm_failure_surfaces_as_error_message() {
    let daemon = TestDaemon::new();
    *daemon.llm.fail.lock() = true;
    let reply = handle_message(
        &daemon.state,
        &json!({"type": "chat_message", "conversation_id": "cv-1", "content": "hi"}),
    )
    .await
    .unwrap();
    assert_eq!(reply["type"], json!("error"));
    assert_eq!(reply["error_type"], json!("chat_failed"));
}

#[tokio::test]
async fn ask_user_response_is_recorded() {
    let daemon = TestDaemon::new();
    let reply = handle_ask_user_response(
        &daemon.state,
        &json!({"conversation_id": "cv-1", "request_id": "q-1", "answer": "yes"}),
    )
    .unwrap();
    assert_eq!(reply["type"], json!("ask_user_ack"));
}

#[test]
fn idle_eviction_removes_stale_sessions() {
    let sessions = ChatSessions::new();
    sessions.with_session("old", |_| {});
    assert_eq!(sessions.len(), 1);
    // Zero timeout evicts immediately.
    let evicted = sessions.evict_idle(Duration::from_secs(0));
    assert_eq!(evicted, 1);
    assert!(sessions.is_empty());
}
