// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! External service seams
//!
//! LLM providers, vector stores, and MCP tool proxies are out of scope
//! for the core; workflows reach them through these narrow contracts.
//! Test fakes live behind the `test-support` feature.

use async_trait::async_trait;
use serde_json::Value;

/// A single LLM invocation.
#[derive(Debug, Clone, Default)]
pub struct LlmRequest {
    pub prompt: String,
    pub system: Option<String>,
    /// Tool whitelist for agentic prompt steps.
    pub tools: Vec<String>,
    pub max_tokens: Option<u32>,
}

#[async_trait]
pub trait LlmService: Send + Sync {
    /// Run a prompt and return the structured result.
    async fn complete(&self, request: LlmRequest) -> Result<Value, String>;
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Embed and index `content` under `id`.
    async fn index(&self, id: &str, content: &str) -> Result<(), String>;

    /// Ids of the `limit` entries most similar to `query`.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<String>, String>;

    async fn delete(&self, id: &str) -> Result<(), String>;
}

#[async_trait]
pub trait ToolProxy: Send + Sync {
    /// Call a tool on a named MCP server.
    async fn call_tool(&self, server: &str, tool: &str, args: Value) -> Result<Value, String>;
}

#[cfg(any(test, feature = "test-support"))]
pub mod fakes {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    /// Returns a canned response and records prompts.
    #[derive(Default)]
    pub struct FakeLlm {
        pub response: Mutex<Value>,
        pub prompts: Mutex<Vec<String>>,
        pub fail: Mutex<bool>,
    }

    impl FakeLlm {
        pub fn returning(value: Value) -> Self {
            Self { response: Mutex::new(value), ..Default::default() }
        }
    }

    #[async_trait]
    impl LlmService for FakeLlm {
        async fn complete(&self, request: LlmRequest) -> Result<Value, String> {
            if *self.fail.lock() {
                return Err("llm unavailable".to_string());
            }
            self.prompts.lock().push(request.prompt);
            Ok(self.response.lock().clone())
        }
    }

    /// In-memory substring "vector" store.
    #[derive(Default)]
    pub struct FakeVectorStore {
        pub entries: Mutex<HashMap<String, String>>,
    }

    #[async_trait]
    impl VectorStore for FakeVectorStore {
        async fn index(&self, id: &str, content: &str) -> Result<(), String> {
            self.entries.lock().insert(id.to_string(), content.to_string());
            Ok(())
        }

        async fn search(&self, query: &str, limit: usize) -> Result<Vec<String>, String> {
            Ok(self
                .entries
                .lock()
                .iter()
                .filter(|(_, content)| content.contains(query))
                .map(|(id, _)| id.clone())
                .take(limit)
                .collect())
        }

        async fn delete(&self, id: &str) -> Result<(), String> {
            self.entries.lock().remove(id);
            Ok(())
        }
    }
}
