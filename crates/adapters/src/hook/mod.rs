// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hook translation adapters
//!
//! One adapter per CLI front-end. Each is two pure translation functions
//! plus `handle_native`, which composes translate → dispatch → render.
//! Unknown native hook names map to `Notification` (fail-open), and
//! context-injection fields are only emitted for hook types whose CLI
//! channel accepts them.

mod claude;
mod codex;
mod common;
mod copilot;
mod cursor;
mod gemini;

pub use claude::ClaudeAdapter;
pub use codex::CodexAdapter;
pub use copilot::CopilotAdapter;
pub use cursor::CursorAdapter;
pub use gemini::GeminiAdapter;

use crate::AdapterError;
use async_trait::async_trait;
use gobby_core::{HookEvent, HookResponse, SessionSource};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// The daemon-side hook pipeline an adapter dispatches into.
///
/// Implemented by the engine's HookManager; adapters only see this seam.
#[async_trait]
pub trait HookHandler: Send + Sync {
    async fn handle(&self, event: HookEvent) -> HookResponse;
}

/// A per-CLI hook translation shim.
#[async_trait]
pub trait HookAdapter: Send + Sync {
    fn source(&self) -> SessionSource;

    /// Normalize a native payload into the unified event.
    fn translate_to_hook_event(&self, native: &Value) -> Result<HookEvent, AdapterError>;

    /// Render the unified response into the CLI's expected shape.
    ///
    /// `native` is the original request payload, consulted for the hook
    /// name vocabulary the CLI expects echoed back.
    fn translate_from_hook_response(&self, response: &HookResponse, native: &Value) -> Value;

    /// Compose translate → handle → render.
    async fn handle_native(&self, native: Value, handler: &dyn HookHandler) -> Value {
        let event = match self.translate_to_hook_event(&native) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(source = %self.source(), error = %e, "dropping malformed hook");
                return self.translate_from_hook_response(&HookResponse::allow(), &native);
            }
        };
        let response = handler.handle(event).await;
        self.translate_from_hook_response(&response, &native)
    }
}

impl std::fmt::Debug for dyn HookAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookAdapter")
            .field("source", &self.source())
            .finish()
    }
}

/// Registry of adapters keyed by their URL slug (`/hooks/<adapter>`).
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: HashMap<String, Arc<dyn HookAdapter>>,
}

impl AdapterRegistry {
    /// Registry with every built-in adapter.
    pub fn with_builtins() -> Self {
        let mut registry = Self::default();
        registry.register(Arc::new(ClaudeAdapter));
        registry.register(Arc::new(GeminiAdapter));
        registry.register(Arc::new(CodexAdapter));
        registry.register(Arc::new(CursorAdapter));
        registry.register(Arc::new(CopilotAdapter));
        registry
    }

    pub fn register(&mut self, adapter: Arc<dyn HookAdapter>) {
        self.adapters.insert(adapter.source().as_str().to_string(), adapter);
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn HookAdapter>, AdapterError> {
        self.adapters
            .get(name)
            .cloned()
            .ok_or_else(|| AdapterError::UnknownAdapter(name.to_string()))
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.adapters.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
