// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Handoff context extraction
//!
//! Parses a session's JSONL transcript into a structured handoff
//! summary (initial goal, active task, files modified, recent activity)
//! rendered to markdown for `session.compact_markdown`.

use serde_json::Value;
use std::collections::BTreeSet;
use std::path::Path;

/// Structured handoff state recovered from a transcript.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HandoffContext {
    /// First user message, taken as the session goal.
    pub initial_goal: Option<String>,
    /// Task reference mentioned in the most recent tool traffic.
    pub active_task: Option<String>,
    /// Files touched by Write/Edit tool calls.
    pub files_modified: Vec<String>,
    /// Trailing assistant messages, newest last.
    pub recent_activity: Vec<String>,
}

const RECENT_LIMIT: usize = 5;
const SNIPPET_LIMIT: usize = 200;

/// Parse a JSONL transcript file. Unreadable files and malformed lines
/// degrade to an empty context rather than erroring.
pub fn extract_from_file(path: &Path) -> HandoffContext {
    match std::fs::read_to_string(path) {
        Ok(text) => extract(&text),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "transcript unreadable");
            HandoffContext::default()
        }
    }
}

/// Parse transcript text: one JSON object per line.
pub fn extract(text: &str) -> HandoffContext {
    let mut ctx = HandoffContext::default();
    let mut files: BTreeSet<String> = BTreeSet::new();
    let mut recent: Vec<String> = Vec::new();

    for line in text.lines() {
        let Ok(entry) = serde_json::from_str::<Value>(line) else {
            continue;
        };
        let role = entry
            .get("role")
            .or_else(|| entry.get("type"))
            .and_then(Value::as_str)
            .unwrap_or("");
        match role {
            "user" => {
                if ctx.initial_goal.is_none() {
                    if let Some(content) = text_content(&entry) {
                        ctx.initial_goal = Some(snippet(&content));
                    }
                }
            }
            "assistant" => {
                if let Some(content) = text_content(&entry) {
                    recent.push(snippet(&content));
                }
            }
            _ => {}
        }
        // Tool calls carry file paths and task references.
        if let Some(tool_name) = entry.get("tool_name").and_then(Value::as_str) {
            let input = entry.get("tool_input").cloned().unwrap_or(Value::Null);
            if matches!(tool_name, "Write" | "Edit" | "write_file" | "edit_file") {
                if let Some(path) = input
                    .get("file_path")
                    .or_else(|| input.get("path"))
                    .and_then(Value::as_str)
                {
                    files.insert(path.to_string());
                }
            }
            if let Some(task_ref) = input.get("task_id").and_then(Value::as_str) {
                ctx.active_task = Some(task_ref.to_string());
            }
        }
    }

    let skip = recent.len().saturating_sub(RECENT_LIMIT);
    ctx.recent_activity = recent.into_iter().skip(skip).collect();
    ctx.files_modified = files.into_iter().collect();
    ctx
}

/// Render the context as the handoff markdown document.
pub fn render_markdown(ctx: &HandoffContext) -> String {
    let mut out = String::from("## Handoff Context\n");
    if let Some(goal) = &ctx.initial_goal {
        out.push_str(&format!("\n### Goal\n{goal}\n"));
    }
    if let Some(task) = &ctx.active_task {
        out.push_str(&format!("\n### Active Task\n{task}\n"));
    }
    if !ctx.files_modified.is_empty() {
        out.push_str("\n### Files Modified\n");
        for file in &ctx.files_modified {
            out.push_str(&format!("- {file}\n"));
        }
    }
    if !ctx.recent_activity.is_empty() {
        out.push_str("\n### Recent Activity\n");
        for entry in &ctx.recent_activity {
            out.push_str(&format!("- {entry}\n"));
        }
    }
    out
}

fn text_content(entry: &Value) -> Option<String> {
    match entry.get("content") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Array(parts)) => {
            let text: Vec<&str> = parts
                .iter()
                .filter_map(|p| p.get("text").and_then(Value::as_str))
                .collect();
            if text.is_empty() {
                None
            } else {
                Some(text.join(" "))
            }
        }
        _ => entry.get("message").and_then(Value::as_str).map(str::to_string),
    }
}

fn snippet(s: &str) -> String {
    let trimmed = s.trim();
    if trimmed.chars().count() <= SNIPPET_LIMIT {
        trimmed.to_string()
    } else {
        let cut: String = trimmed.chars().take(SNIPPET_LIMIT).collect();
        format!("{cut}…")
    }
}

#[cfg(test)]
#[path = "handoff_tests.rs"]
mod tests;
