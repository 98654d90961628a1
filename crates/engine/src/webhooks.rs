// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Webhook delivery
//!
//! Shared by pipeline lifecycle notifications and hook-dispatched
//! webhooks. Policy: 4xx responses are terminal (no retry); 5xx and
//! timeouts retry with the configured constant delay up to retry_count.
//! A `can_block` endpoint's `{"decision": "block"|"deny"}` body
//! short-circuits the call site.

use gobby_core::HookEventType;
use gobby_workflow::WebhookDef;
use serde_json::Value;
use std::time::Duration;

/// A daemon-level webhook subscribed to hook events.
#[derive(Debug, Clone)]
pub struct HookWebhook {
    pub endpoint: WebhookDef,
    /// Event types this webhook receives; empty means all.
    pub event_types: Vec<HookEventType>,
}

impl HookWebhook {
    pub fn wants(&self, event_type: HookEventType) -> bool {
        self.event_types.is_empty() || self.event_types.contains(&event_type)
    }
}

/// Outcome of delivering one webhook.
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookOutcome {
    Delivered(Option<Value>),
    /// Terminal rejection (4xx) or retries exhausted.
    Failed(String),
}

impl WebhookOutcome {
    /// Blocking decision from a `can_block` endpoint's body, if any.
    pub fn blocking_decision(&self) -> Option<(String, Option<String>)> {
        let WebhookOutcome::Delivered(Some(body)) = self else {
            return None;
        };
        let decision = body.get("decision").and_then(Value::as_str)?;
        if decision == "block" || decision == "deny" {
            let reason = body.get("reason").and_then(Value::as_str).map(str::to_string);
            return Some((decision.to_string(), reason));
        }
        None
    }
}

#[derive(Clone, Default)]
pub struct WebhookClient {
    client: reqwest::Client,
}

impl WebhookClient {
    pub fn new() -> Self {
        Self { client: reqwest::Client::new() }
    }

    /// Deliver `payload` to one endpoint, honoring its retry policy.
    pub async fn deliver(&self, endpoint: &WebhookDef, payload: &Value) -> WebhookOutcome {
        let mut attempt = 0u32;
        loop {
            match self.send_once(endpoint, payload).await {
                SendResult::Ok(body) => return WebhookOutcome::Delivered(body),
                SendResult::Terminal(reason) => {
                    tracing::warn!(url = %endpoint.url, reason, "webhook rejected");
                    return WebhookOutcome::Failed(reason);
                }
                SendResult::Transient(reason) => {
                    if attempt >= endpoint.retry_count {
                        tracing::warn!(url = %endpoint.url, reason, "webhook retries exhausted");
                        return WebhookOutcome::Failed(reason);
                    }
                    attempt += 1;
                    tokio::time::sleep(Duration::from_secs(endpoint.retry_delay)).await;
                }
            }
        }
    }

    /// Deliver to every endpoint in order; returns the first blocking
    /// decision from a `can_block` endpoint, if any.
    pub async fn deliver_all(
        &self,
        endpoints: &[WebhookDef],
        payload: &Value,
    ) -> Option<(String, Option<String>)> {
        for endpoint in endpoints {
            let outcome = self.deliver(endpoint, payload).await;
            if endpoint.can_block {
                if let Some(decision) = outcome.blocking_decision() {
                    return Some(decision);
                }
            }
        }
        None
    }

    async fn send_once(&self, endpoint: &WebhookDef, payload: &Value) -> SendResult {
        let method = reqwest::Method::from_bytes(endpoint.method.as_bytes())
            .unwrap_or(reqwest::Method::POST);
        let mut request = self
            .client
            .request(method, &endpoint.url)
            .timeout(Duration::from_secs(endpoint.timeout))
            .json(payload);
        for (key, value) in &endpoint.headers {
            request = request.header(key, value);
        }
        match request.send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    SendResult::Ok(response.json::<Value>().await.ok())
                } else if status.is_client_error() {
                    SendResult::Terminal(format!("client error {status}"))
                } else {
                    SendResult::Transient(format!("server error {status}"))
                }
            }
            Err(e) if e.is_timeout() => SendResult::Transient(format!("timeout: {e}")),
            Err(e) => SendResult::Transient(format!("send error: {e}")),
        }
    }
}

enum SendResult {
    Ok(Option<Value>),
    Terminal(String),
    Transient(String),
}

#[cfg(test)]
#[path = "webhooks_tests.rs"]
mod tests;
