// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use gobby_workflow::WebhookDef;

fn endpoint(url: &str) -> WebhookDef {
    WebhookDef {
        url: url.to_string(),
        method: "POST".to_string(),
        headers: Default::default(),
        timeout: 1,
        retry_count: 0,
        retry_delay: 0,
        can_block: false,
    }
}

#[test]
fn hook_webhook_event_filter() {
    let all = HookWebhook { endpoint: endpoint("http://x"), event_types: vec![] };
    assert!(all.wants(HookEventType::BeforeTool));
    assert!(all.wants(HookEventType::Stop));

    let narrow = HookWebhook {
        endpoint: endpoint("http://x"),
        event_types: vec![HookEventType::BeforeTool],
    };
    assert!(narrow.wants(HookEventType::BeforeTool));
    assert!(!narrow.wants(HookEventType::Stop));
}

#[test]
fn blocking_decision_parsed_from_body() {
    let outcome =
        WebhookOutcome::Delivered(Some(serde_json::json!({"decision": "block", "reason": "no"})));
    let (decision, reason) = outcome.blocking_decision().unwrap();
    assert_eq!(decision, "block");
    assert_eq!(reason.as_deref(), Some("no"));

    let deny = WebhookOutcome::Delivered(Some(serde_json::json!({"decision": "deny"})));
    assert!(deny.blocking_decision().is_some());

    let allow = WebhookOutcome::Delivered(Some(serde_json::json!({"decision": "allow"})));
    assert!(allow.blocking_decision().is_none());

    let empty = WebhookOutcome::Delivered(None);
    assert!(empty.blocking_decision().is_none());

    let failed = WebhookOutcome::Failed("x".to_string());
    assert!(failed.blocking_decision().is_none());
}

#[tokio::test]
async fn unreachable_endpoint_fails_after_retries() {
    // Nothing listens on this port; connection errors are transient and
    // retry once, then fail.
    let mut ep = endpoint("http://127.0.0.1:1/hook");
    ep.retry_count = 1;
    let client = WebhookClient::new();
    let outcome = client.deliver(&ep, &serde_json::json!({})).await;
    assert!(matches!(outcome, WebhookOutcome::Failed(_)));
}

#[tokio::test]
async fn deliver_all_ignores_non_blocking_failures() {
    let client = WebhookClient::new();
    let decision = client
        .deliver_all(&[endpoint("http://127.0.0.1:1/hook")], &serde_json::json!({}))
        .await;
    assert!(decision.is_none());
}
