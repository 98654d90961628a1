// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Context-injection handlers

use super::{ActionContext, ActionExecutor};
use crate::handoff;
use crate::EngineError;
use gobby_workflow::TriggerAction;
use serde_json::{json, Map, Value};
use std::path::Path;

impl ActionExecutor {
    /// `inject_context{source, template?, require?}`
    ///
    /// Sources: `previous_session_summary` / `handoff` (parent summary),
    /// `compact_handoff` (this session's compact markdown), `observations`,
    /// `workflow_state`, `artifacts`. `require: true` blocks when the
    /// source is empty.
    pub(super) async fn inject_context(
        &self,
        action: &TriggerAction,
        ctx: &ActionContext,
    ) -> Result<Map<String, Value>, EngineError> {
        // Literal content wins; it is what trigger-declared injections use.
        if let Some(content) = self.render_param(action, "content", ctx) {
            let mut out = Map::new();
            out.insert("inject_context".to_string(), json!(content));
            return Ok(out);
        }

        let source = action.param_str("source").unwrap_or("previous_session_summary");
        let body = match source {
            "previous_session_summary" | "handoff" => {
                let session = self.sessions.get(&ctx.session_id)?;
                match session.parent_session_id.as_deref() {
                    Some(parent_id) => {
                        let parent = self.sessions.get(parent_id)?;
                        parent
                            .compact_markdown
                            .or(parent.summary_markdown)
                            .unwrap_or_default()
                    }
                    None => String::new(),
                }
            }
            "compact_handoff" => {
                let session = self.sessions.get(&ctx.session_id)?;
                session.compact_markdown.unwrap_or_default()
            }
            "observations" => {
                let state = self.states.get(&ctx.session_id, &ctx.workflow_name)?;
                state
                    .map(|s| s.observations.join("\n"))
                    .unwrap_or_default()
            }
            "workflow_state" => {
                let state = self.states.get(&ctx.session_id, &ctx.workflow_name)?;
                state
                    .map(|s| {
                        format!(
                            "workflow: {}\nstep: {}\nactions: {}",
                            s.workflow_name, s.step, s.total_action_count
                        )
                    })
                    .unwrap_or_default()
            }
            "artifacts" => {
                // Artifacts are observation entries tagged as artifacts.
                let state = self.states.get(&ctx.session_id, &ctx.workflow_name)?;
                state
                    .map(|s| {
                        s.observations
                            .iter()
                            .filter(|o| o.starts_with("artifact:"))
                            .cloned()
                            .collect::<Vec<_>>()
                            .join("\n")
                    })
                    .unwrap_or_default()
            }
            other => {
                tracing::warn!(source = other, "unknown inject_context source");
                String::new()
            }
        };

        let mut out = Map::new();
        if body.is_empty() {
            if action.param_bool("require") {
                out.insert("decision".to_string(), json!("block"));
                out.insert(
                    "reason".to_string(),
                    json!(format!("required context source '{source}' is empty")),
                );
            }
            return Ok(out);
        }

        let rendered = match action.param_str("template") {
            Some(template) => {
                let mut tctx = ctx.eval_context.clone();
                tctx.insert("content".to_string(), json!(body));
                self.templates.render(template, &tctx)
            }
            None => body,
        };
        out.insert("inject_context".to_string(), json!(rendered));
        Ok(out)
    }

    /// `inject_message{content}` — template-rendered user-visible note.
    pub(super) fn inject_message(
        &self,
        action: &TriggerAction,
        ctx: &ActionContext,
    ) -> Result<Map<String, Value>, EngineError> {
        let content = self
            .render_param(action, "content", ctx)
            .ok_or_else(|| EngineError::Validation("inject_message needs 'content'".to_string()))?;
        let mut out = Map::new();
        out.insert("inject_message".to_string(), json!(content));
        Ok(out)
    }

    /// `restore_context{template?}` — re-inject the parent session's
    /// summary.
    pub(super) fn restore_context(
        &self,
        action: &TriggerAction,
        ctx: &ActionContext,
    ) -> Result<Map<String, Value>, EngineError> {
        let session = self.sessions.get(&ctx.session_id)?;
        let summary = session
            .parent_session_id
            .as_deref()
            .and_then(|parent_id| self.sessions.get(parent_id).ok())
            .and_then(|parent| parent.summary_markdown)
            .unwrap_or_default();
        let mut out = Map::new();
        if summary.is_empty() {
            return Ok(out);
        }
        let rendered = match action.param_str("template") {
            Some(template) => {
                let mut tctx = ctx.eval_context.clone();
                tctx.insert("content".to_string(), json!(summary));
                self.templates.render(template, &tctx)
            }
            None => summary,
        };
        out.insert("inject_context".to_string(), json!(rendered));
        Ok(out)
    }

    /// `extract_handoff_context` — parse the transcript into handoff
    /// markdown stored on the session.
    pub(super) fn extract_handoff_context(
        &self,
        ctx: &ActionContext,
    ) -> Result<Map<String, Value>, EngineError> {
        let session = self.sessions.get(&ctx.session_id)?;
        let Some(jsonl_path) = session.jsonl_path.as_deref() else {
            return Ok(Map::new());
        };
        let handoff_ctx = handoff::extract_from_file(Path::new(jsonl_path));
        let markdown = handoff::render_markdown(&handoff_ctx);
        self.sessions.set_compact_markdown(&ctx.session_id, &markdown)?;
        let mut out = Map::new();
        out.insert("handoff_extracted".to_string(), json!(true));
        Ok(out)
    }
}
