// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event broadcaster
//!
//! Fans hook events and system messages out to WebSocket clients over a
//! tokio broadcast channel. Delivery is best effort: a lagging or gone
//! receiver never affects the hook decision.

use serde_json::{json, Value};
use tokio::sync::broadcast;

/// A message published to subscribed clients.
#[derive(Debug, Clone)]
pub struct BroadcastMessage {
    /// Hook event type for subscription filtering; `None` marks a
    /// system message delivered to everyone.
    pub event_type: Option<String>,
    pub payload: Value,
}

#[derive(Clone)]
pub struct Broadcaster {
    sender: broadcast::Sender<BroadcastMessage>,
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new(256)
    }
}

impl Broadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BroadcastMessage> {
        self.sender.subscribe()
    }

    /// Publish a hook event with its (optional) response.
    pub fn broadcast_hook_event(
        &self,
        event: &gobby_core::HookEvent,
        response: Option<&gobby_core::HookResponse>,
    ) {
        let payload = json!({
            "type": "hook_event",
            "event_type": event.event_type.as_str(),
            "source": event.source.as_str(),
            "external_id": event.external_id,
            "data": event.data,
            "metadata": event.metadata,
            "response": response,
        });
        let _ = self.sender.send(BroadcastMessage {
            event_type: Some(event.event_type.as_str().to_string()),
            payload,
        });
    }

    /// Publish a system message, delivered regardless of subscriptions.
    pub fn broadcast_system(&self, payload: Value) {
        let _ = self.sender.send(BroadcastMessage { event_type: None, payload });
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[cfg(test)]
#[path = "broadcaster_tests.rs"]
mod tests;
