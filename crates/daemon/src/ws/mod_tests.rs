// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::TestDaemon;
use serde_json::json;

async fn dispatch_one(daemon: &TestDaemon, client: &mut Client, request: Value) -> Option<Value> {
    dispatch(&daemon.state, client, &request).await
}

fn client() -> Client {
    Client { subscriptions: HashSet::new() }
}

#[tokio::test]
async fn ping_pong() {
    let daemon = TestDaemon::new();
    let mut c = client();
    let reply = dispatch_one(&daemon, &mut c, json!({"type": "ping"})).await.unwrap();
    assert_eq!(reply["type"], json!("pong"));
}

#[tokio::test]
async fn subscribe_and_filtering() {
    let daemon = TestDaemon::new();
    let mut c = client();
    dispatch_one(&daemon, &mut c, json!({"type": "subscribe", "events": ["before_tool"]}))
        .await
        .unwrap();
    assert!(c.wants(Some("before_tool")));
    assert!(!c.wants(Some("stop")));
    // System messages always pass.
    assert!(c.wants(None));

    dispatch_one(&daemon, &mut c, json!({"type": "unsubscribe", "events": ["before_tool"]}))
        .await
        .unwrap();
    assert!(!c.wants(Some("before_tool")));
}

#[tokio::test]
async fn subscribe_star_matches_everything() {
    let daemon = TestDaemon::new();
    let mut c = client();
    dispatch_one(&daemon, &mut c, json!({"type": "subscribe"})).await.unwrap();
    assert!(c.wants(Some("before_tool")));
    assert!(c.wants(Some("session_start")));
}

#[tokio::test]
async fn unknown_type_errors() {
    let daemon = TestDaemon::new();
    let mut c = client();
    let reply = dispatch_one(&daemon, &mut c, json!({"type": "warp_drive"})).await.unwrap();
    assert_eq!(reply["type"], json!("error"));
    assert_eq!(reply["error_type"], json!("unknown_type"));
}

#[tokio::test]
async fn voice_messages_report_not_enabled() {
    let daemon = TestDaemon::new();
    let mut c = client();
    for message_type in ["voice_audio", "voice_mode_toggle"] {
        let reply = dispatch_one(&daemon, &mut c, json!({"type": message_type}))
            .await
            .unwrap();
        assert_eq!(reply["error_type"], json!("not_enabled"), "type: {message_type}");
    }
}

#[tokio::test]
async fn tool_call_without_proxy_reports_not_configured() {
    let daemon = TestDaemon::new();
    let mut c = client();
    let reply = dispatch_one(
        &daemon,
        &mut c,
        json!({"type": "tool_call", "tool": "list_tools"}),
    )
    .await
    .unwrap();
    assert_eq!(reply["error_type"], json!("not_configured"));
}

#[tokio::test]
async fn tmux_create_and_send_through_adapter() {
    let daemon = TestDaemon::new();
    let mut c = client();
    let reply = dispatch_one(
        &daemon,
        &mut c,
        json!({"type": "tmux_create", "name": "dev", "command": "bash"}),
    )
    .await
    .unwrap();
    assert_eq!(reply["type"], json!("tmux_created"));
    let session_id = reply["session_id"].as_str().unwrap().to_string();

    let reply = dispatch_one(
        &daemon,
        &mut c,
        json!({"type": "tmux_send", "session_id": session_id, "input": "ls"}),
    )
    .await
    .unwrap();
    assert_eq!(reply["type"], json!("tmux_ack"));
    assert_eq!(daemon.terminal.sent_inputs(&session_id), vec!["ls"]);

    let reply = dispatch_one(
        &daemon,
        &mut c,
        json!({"type": "tmux_kill", "session_id": session_id}),
    )
    .await
    .unwrap();
    assert_eq!(reply["type"], json!("tmux_killed"));
}

#[tokio::test]
async fn chat_message_round_trip() {
    let daemon = TestDaemon::new();
    *daemon.llm.response.lock() = json!("hello back");
    let mut c = client();
    let reply = dispatch_one(
        &daemon,
        &mut c,
        json!({"type": "chat_message", "conversation_id": "cv-1", "content": "hello"}),
    )
    .await
    .unwrap();
    assert_eq!(reply["type"], json!("chat_response"));
    assert_eq!(reply["content"], json!("hello back"));
    assert_eq!(daemon.state.chats.len(), 1);
}

#[tokio::test]
async fn stop_request_cancels_agent() {
    let daemon = TestDaemon::new();
    let parent = daemon
        .state
        .sessions
        .register(
            "root",
            "m1",
            gobby_core::SessionSource::Claude,
            "p1",
            Default::default(),
        )
        .unwrap();
    let spawned = daemon
        .state
        .runner
        .spawn(gobby_engine::SpawnRequest {
            agent: "x".to_string(),
            parent_session_id: parent.id,
            mode: Some(gobby_core::AgentMode::Terminal),
            ..Default::default()
        })
        .await
        .unwrap();

    let mut c = client();
    let reply = dispatch_one(
        &daemon,
        &mut c,
        json!({"type": "stop_request", "run_id": spawned.run_id.as_str()}),
    )
    .await
    .unwrap();
    assert_eq!(reply["type"], json!("stopped"));
    assert!(daemon.state.registry.get(&spawned.run_id).is_none());
}
