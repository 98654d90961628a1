// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

const TRANSCRIPT: &str = r##"{"role": "user", "content": "fix the login bug"}
{"role": "assistant", "content": "Looking at the auth module."}
{"role": "tool", "tool_name": "Edit", "tool_input": {"file_path": "src/auth.rs"}}
{"role": "tool", "tool_name": "Write", "tool_input": {"file_path": "src/session.rs", "task_id": "#4"}}
{"role": "assistant", "content": "Patched the token refresh."}
not json at all
{"role": "assistant", "content": "Done."}
"##;

#[test]
fn extracts_goal_files_and_activity() {
    let ctx = extract(TRANSCRIPT);
    assert_eq!(ctx.initial_goal.as_deref(), Some("fix the login bug"));
    assert_eq!(
        ctx.files_modified,
        vec!["src/auth.rs".to_string(), "src/session.rs".to_string()]
    );
    assert_eq!(ctx.active_task.as_deref(), Some("#4"));
    assert_eq!(ctx.recent_activity.len(), 3);
    assert_eq!(ctx.recent_activity.last().map(String::as_str), Some("Done."));
}

#[test]
fn recent_activity_is_capped_to_tail() {
    let mut lines = String::new();
    for i in 0..10 {
        lines.push_str(&format!("{{\"role\": \"assistant\", \"content\": \"step {i}\"}}\n"));
    }
    let ctx = extract(&lines);
    assert_eq!(ctx.recent_activity.len(), 5);
    assert_eq!(ctx.recent_activity[0], "step 5");
}

#[test]
fn array_content_blocks_are_joined() {
    let line = r#"{"role": "user", "content": [{"type": "text", "text": "part one"}, {"type": "text", "text": "part two"}]}"#;
    let ctx = extract(line);
    assert_eq!(ctx.initial_goal.as_deref(), Some("part one part two"));
}

#[test]
fn empty_and_garbage_input_degrade_gracefully() {
    assert_eq!(extract(""), HandoffContext::default());
    assert_eq!(extract("{{{{"), HandoffContext::default());
}

#[test]
fn unreadable_file_yields_default() {
    let ctx = extract_from_file(Path::new("/nonexistent/transcript.jsonl"));
    assert_eq!(ctx, HandoffContext::default());
}

#[test]
fn markdown_rendering_includes_sections() {
    let ctx = extract(TRANSCRIPT);
    let markdown = render_markdown(&ctx);
    assert!(markdown.starts_with("## Handoff Context"));
    assert!(markdown.contains("### Goal"));
    assert!(markdown.contains("fix the login bug"));
    assert!(markdown.contains("- src/auth.rs"));
    assert!(markdown.contains("### Active Task"));
}

#[test]
fn empty_context_renders_header_only() {
    let markdown = render_markdown(&HandoffContext::default());
    assert_eq!(markdown.trim(), "## Handoff Context");
}

#[test]
fn long_messages_are_snipped() {
    let long = "x".repeat(500);
    let line = format!("{{\"role\": \"user\", \"content\": \"{long}\"}}");
    let ctx = extract(&line);
    let goal = ctx.initial_goal.unwrap();
    assert!(goal.chars().count() <= 201);
    assert!(goal.ends_with('…'));
}
