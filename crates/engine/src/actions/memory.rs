// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Memory handlers
//!
//! All gated by `memory.config.enabled`; deduped on exact content. The
//! vector store and LLM are optional seams — extraction falls back to a
//! simple store of the raw content when the LLM call fails.

use super::{ActionContext, ActionExecutor};
use crate::llm::LlmRequest;
use crate::EngineError;
use gobby_workflow::TriggerAction;
use serde_json::{json, Map, Value};

impl ActionExecutor {
    fn memory_disabled(&self) -> Option<Result<Map<String, Value>, EngineError>> {
        if self.memory_enabled {
            None
        } else {
            Some(Ok(Map::new()))
        }
    }

    /// `memory_save{content, memory_type?, tags?}`
    pub(super) async fn memory_save(
        &self,
        action: &TriggerAction,
        ctx: &ActionContext,
    ) -> Result<Map<String, Value>, EngineError> {
        if let Some(skip) = self.memory_disabled() {
            return skip;
        }
        let content = self
            .render_param(action, "content", ctx)
            .ok_or_else(|| EngineError::Validation("memory_save needs 'content'".to_string()))?;
        if self.memories.content_exists(&ctx.project_id, &content)? {
            let mut out = Map::new();
            out.insert("memory_saved".to_string(), json!(false));
            out.insert("reason".to_string(), json!("duplicate"));
            return Ok(out);
        }
        let memory_type = action.param_str("memory_type").unwrap_or("fact");
        let tags: Vec<String> = action
            .params
            .get("tags")
            .and_then(Value::as_array)
            .map(|items| {
                items.iter().filter_map(Value::as_str).map(str::to_string).collect()
            })
            .unwrap_or_default();
        let memory = self.memories.save(
            &ctx.project_id,
            &content,
            memory_type,
            "workflow",
            Some(&ctx.session_id),
            &tags,
        )?;
        if let Some(vectors) = &self.vectors {
            if let Err(e) = vectors.index(&memory.id, &content).await {
                tracing::warn!(error = %e, "vector index failed; memory kept in sqlite only");
            }
        }
        let mut out = Map::new();
        out.insert("memory_saved".to_string(), json!(true));
        out.insert("memory_id".to_string(), json!(memory.id));
        Ok(out)
    }

    /// `memory_recall_relevant{query?, limit?}` — vector search when
    /// available, substring search otherwise.
    pub(super) async fn memory_recall_relevant(
        &self,
        action: &TriggerAction,
        ctx: &ActionContext,
    ) -> Result<Map<String, Value>, EngineError> {
        if let Some(skip) = self.memory_disabled() {
            return skip;
        }
        let query = self
            .render_param(action, "query", ctx)
            .unwrap_or_else(|| ctx.event.prompt().to_string());
        if query.is_empty() {
            return Ok(Map::new());
        }
        let limit = action.params.get("limit").and_then(Value::as_u64).unwrap_or(5) as usize;

        let memories = match &self.vectors {
            Some(vectors) => match vectors.search(&query, limit).await {
                Ok(ids) => {
                    let mut found = Vec::new();
                    for id in ids {
                        if let Ok(memory) = self.memories.get(&id) {
                            found.push(memory);
                        }
                    }
                    found
                }
                Err(e) => {
                    tracing::warn!(error = %e, "vector search failed; falling back to text");
                    self.memories.search_text(&ctx.project_id, &query, limit)?
                }
            },
            None => self.memories.search_text(&ctx.project_id, &query, limit)?,
        };
        if memories.is_empty() {
            return Ok(Map::new());
        }
        let body = memories
            .iter()
            .map(|m| format!("- {}", m.content))
            .collect::<Vec<_>>()
            .join("\n");
        let mut out = Map::new();
        out.insert(
            "inject_context".to_string(),
            json!(format!("Relevant memories:\n{body}")),
        );
        Ok(out)
    }

    /// `memory_inject_project_context` — recent project memories.
    pub(super) async fn memory_inject_project_context(
        &self,
        ctx: &ActionContext,
    ) -> Result<Map<String, Value>, EngineError> {
        if let Some(skip) = self.memory_disabled() {
            return skip;
        }
        let memories = self.memories.list_by_project(&ctx.project_id, 10)?;
        if memories.is_empty() {
            return Ok(Map::new());
        }
        let body = memories
            .iter()
            .map(|m| format!("- [{}] {}", m.memory_type, m.content))
            .collect::<Vec<_>>()
            .join("\n");
        let mut out = Map::new();
        out.insert(
            "inject_context".to_string(),
            json!(format!("Project memory:\n{body}")),
        );
        Ok(out)
    }

    /// `memory_extract_from_session` — LLM fact extraction over the
    /// transcript; on LLM failure the raw trailing transcript is stored
    /// instead so nothing is lost.
    pub(super) async fn memory_extract_from_session(
        &self,
        ctx: &ActionContext,
    ) -> Result<Map<String, Value>, EngineError> {
        if let Some(skip) = self.memory_disabled() {
            return skip;
        }
        let session = self.sessions.get(&ctx.session_id)?;
        let Some(path) = session.jsonl_path.as_deref() else {
            return Ok(Map::new());
        };
        let Ok(transcript) = std::fs::read_to_string(path) else {
            return Ok(Map::new());
        };
        if transcript.is_empty() {
            return Ok(Map::new());
        }

        let facts: Vec<String> = match &self.llm {
            Some(llm) => {
                let request = LlmRequest {
                    prompt: format!(
                        "Extract durable project facts from this session transcript, \
                         one per line:\n\n{transcript}"
                    ),
                    ..Default::default()
                };
                match llm.complete(request).await {
                    Ok(Value::String(text)) => {
                        text.lines().map(str::to_string).filter(|l| !l.is_empty()).collect()
                    }
                    Ok(Value::Array(items)) => items
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect(),
                    Ok(_) | Err(_) => Vec::new(),
                }
            }
            None => Vec::new(),
        };

        let mut saved = 0;
        if facts.is_empty() {
            // Fallback: simple-store the raw tail of the transcript.
            let tail: String = transcript
                .lines()
                .rev()
                .take(20)
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect::<Vec<_>>()
                .join("\n");
            if !self.memories.content_exists(&ctx.project_id, &tail)? {
                self.memories.save(
                    &ctx.project_id,
                    &tail,
                    "session_raw",
                    "extraction",
                    Some(&ctx.session_id),
                    &[],
                )?;
                saved = 1;
            }
        } else {
            for fact in &facts {
                if self.memories.content_exists(&ctx.project_id, fact)? {
                    continue;
                }
                self.memories.save(
                    &ctx.project_id,
                    fact,
                    "fact",
                    "extraction",
                    Some(&ctx.session_id),
                    &[],
                )?;
                saved += 1;
            }
        }
        let mut out = Map::new();
        out.insert("memories_extracted".to_string(), json!(saved));
        Ok(out)
    }

    /// `memory_review_gate` — flags the instance for reflection when
    /// unreviewed extraction output accumulates.
    pub(super) fn memory_review_gate(
        &self,
        ctx: &ActionContext,
    ) -> Result<Map<String, Value>, EngineError> {
        if let Some(skip) = self.memory_disabled() {
            return skip;
        }
        self.states.store().mutate(&ctx.session_id, &ctx.workflow_name, |state| {
            state.reflection_pending = true;
            Ok(())
        })?;
        let mut out = Map::new();
        out.insert(
            "inject_message".to_string(),
            json!("Review extracted memories before they are promoted."),
        );
        Ok(out)
    }

    /// `memory_sync_export{path?}` — write project memories to a JSONL
    /// file under the repo.
    pub(super) fn memory_sync_export(
        &self,
        action: &TriggerAction,
        ctx: &ActionContext,
    ) -> Result<Map<String, Value>, EngineError> {
        if let Some(skip) = self.memory_disabled() {
            return skip;
        }
        let path = action.param_str("path").unwrap_or(".gobby/memories.jsonl");
        let memories = self.memories.list_by_project(&ctx.project_id, 10_000)?;
        let mut body = String::new();
        for memory in &memories {
            let line =
                serde_json::to_string(memory).map_err(gobby_storage::StorageError::from)?;
            body.push_str(&line);
            body.push('\n');
        }
        if let Some(parent) = std::path::Path::new(path).parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| EngineError::Validation(format!("create {}: {e}", parent.display())))?;
        }
        std::fs::write(path, body)
            .map_err(|e| EngineError::Validation(format!("write {path}: {e}")))?;
        let mut out = Map::new();
        out.insert("memories_exported".to_string(), json!(memories.len()));
        Ok(out)
    }

    /// `memory_sync_import{path?}` — load memories from a JSONL export,
    /// deduped on content.
    pub(super) fn memory_sync_import(
        &self,
        action: &TriggerAction,
        ctx: &ActionContext,
    ) -> Result<Map<String, Value>, EngineError> {
        if let Some(skip) = self.memory_disabled() {
            return skip;
        }
        let path = action.param_str("path").unwrap_or(".gobby/memories.jsonl");
        let Ok(text) = std::fs::read_to_string(path) else {
            return Ok(Map::new());
        };
        let mut imported = 0;
        for line in text.lines() {
            let Ok(memory) = serde_json::from_str::<gobby_core::Memory>(line) else {
                continue;
            };
            if self.memories.content_exists(&ctx.project_id, &memory.content)? {
                continue;
            }
            self.memories.save(
                &ctx.project_id,
                &memory.content,
                &memory.memory_type,
                "import",
                None,
                &memory.tags,
            )?;
            imported += 1;
        }
        let mut out = Map::new();
        out.insert("memories_imported".to_string(), json!(imported));
        Ok(out)
    }
}
