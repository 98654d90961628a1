// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Default per-event semantics
//!
//! Thin handlers driving the session status machine, `/gobby` skill
//! interception, skill suggestion, and handoff linking. Workflow-level
//! behavior stays in the engine; these are the daemon's built-ins.

use super::HookManager;
use gobby_core::{HookEvent, HookEventType, HookResponse, Session, SessionSource, SessionStatus};
use std::time::Duration;

impl HookManager {
    pub(super) async fn run_event_handlers(
        &self,
        event: &HookEvent,
        session: &Session,
        first_hook: bool,
        response: &mut HookResponse,
    ) {
        match event.event_type {
            HookEventType::SessionStart => {
                if first_hook {
                    self.link_handoff_parent(session, response).await;
                }
            }
            HookEventType::BeforeAgent => {
                self.handle_before_agent(event, session, response);
            }
            HookEventType::AfterAgent | HookEventType::Stop => {
                self.set_status_logged(&session.id, SessionStatus::Paused);
            }
            HookEventType::PreCompact => {
                // Gemini fires PRE_COMPACT spuriously; ignore it there.
                if event.source != SessionSource::Gemini {
                    self.set_status_logged(&session.id, SessionStatus::HandoffReady);
                }
            }
            HookEventType::SessionEnd => {
                self.set_status_logged(&session.id, SessionStatus::Paused);
            }
            HookEventType::SubagentStart | HookEventType::SubagentStop => {
                tracing::debug!(
                    session_id = %session.id,
                    event_type = %event.event_type,
                    "subagent lifecycle"
                );
            }
            HookEventType::BeforeTool | HookEventType::AfterTool | HookEventType::Notification => {}
        }
    }

    fn handle_before_agent(
        &self,
        event: &HookEvent,
        session: &Session,
        response: &mut HookResponse,
    ) {
        let prompt = event.prompt().trim().to_string();

        // `/gobby` and `/gobby:<skill> [args]` are intercepted.
        if let Some(rest) = prompt.strip_prefix("/gobby") {
            if rest.is_empty() || rest.starts_with(' ') || rest.starts_with(':') {
                self.intercept_skill(rest, session, response);
                return;
            }
        }

        // `/clear` and `/exit` do not reactivate the session.
        if prompt != "/clear" && prompt != "/exit" {
            self.set_status_logged(&session.id, SessionStatus::Active);
        }

        self.suggest_skills(&prompt, session, response);
    }

    /// Render help or a named skill from the prompt store.
    fn intercept_skill(&self, rest: &str, session: &Session, response: &mut HookResponse) {
        let rest = rest.trim_start();
        if let Some(skill_spec) = rest.strip_prefix(':') {
            let (name, args) = match skill_spec.split_once(' ') {
                Some((name, args)) => (name, args.trim()),
                None => (skill_spec, ""),
            };
            let path = format!("skills/{name}");
            match self.prompts.resolve(&path, Some(&session.project_id)) {
                Ok(Some(prompt)) => {
                    let mut content = prompt.content.clone();
                    if !args.is_empty() {
                        content = content.replace("{{ args }}", args);
                    }
                    response.push_context(&content);
                }
                Ok(None) => {
                    response.system_message = Some(format!("Unknown gobby skill: {name}"));
                }
                Err(e) => {
                    tracing::warn!(error = %e, "skill lookup failed");
                }
            }
            return;
        }

        // Bare `/gobby`: list available skills.
        let listing = match self.prompts.list(Some(&session.project_id)) {
            Ok(prompts) => prompts
                .iter()
                .filter(|p| p.path.starts_with("skills/"))
                .map(|p| format!("- /gobby:{} — {}", p.path.trim_start_matches("skills/"), p.description))
                .collect::<Vec<_>>()
                .join("\n"),
            Err(_) => String::new(),
        };
        let help = if listing.is_empty() {
            "No gobby skills installed.".to_string()
        } else {
            format!("Available gobby skills:\n{listing}")
        };
        response.push_context(&help);
    }

    /// Keyword-overlap skill suggestion; fires above the configured
    /// threshold.
    fn suggest_skills(&self, prompt: &str, session: &Session, response: &mut HookResponse) {
        if prompt.is_empty() || prompt.starts_with('/') {
            return;
        }
        let Ok(prompts) = self.prompts.list(Some(&session.project_id)) else {
            return;
        };
        let prompt_words: Vec<String> = tokenize(prompt);
        if prompt_words.is_empty() {
            return;
        }
        let mut best: Option<(f64, String)> = None;
        for skill in prompts.iter().filter(|p| p.path.starts_with("skills/")) {
            let desc_words = tokenize(&skill.description);
            if desc_words.is_empty() {
                continue;
            }
            let overlap = desc_words
                .iter()
                .filter(|w| prompt_words.contains(w))
                .count() as f64
                / desc_words.len() as f64;
            if overlap > best.as_ref().map(|(score, _)| *score).unwrap_or(0.0) {
                best = Some((overlap, skill.path.trim_start_matches("skills/").to_string()));
            }
        }
        if let Some((score, name)) = best {
            if score >= self.config.suggestion_threshold {
                response.system_message = Some(format!(
                    "Tip: /gobby:{name} looks relevant to this prompt."
                ));
            }
        }
    }

    /// Poll for a handoff-ready predecessor on the same
    /// `(machine, project, source)` tuple; link it as parent and expire
    /// it, surfacing its summary for injection.
    async fn link_handoff_parent(&self, session: &Session, response: &mut HookResponse) {
        for attempt in 0..self.config.find_parent_attempts {
            match self.sessions.find_parent(
                &session.machine_id,
                &session.project_id,
                session.source,
                SessionStatus::HandoffReady,
            ) {
                Ok(Some(parent)) if parent.id != session.id => {
                    let register = gobby_storage::sessions::RegisterSession {
                        parent_session_id: Some(parent.id.clone()),
                        ..Default::default()
                    };
                    if let Err(e) = self.sessions.register(
                        &session.external_id,
                        &session.machine_id,
                        session.source,
                        &session.project_id,
                        register,
                    ) {
                        tracing::warn!(error = %e, "failed to link handoff parent");
                        return;
                    }
                    self.set_status_logged(&parent.id, SessionStatus::Expired);
                    response.metadata.parent_session_id = Some(parent.id.clone());
                    if let Some(summary) =
                        parent.compact_markdown.as_deref().or(parent.summary_markdown.as_deref())
                    {
                        response.push_context(summary);
                    }
                    return;
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "find_parent failed");
                    return;
                }
            }
            // Tolerate a race with the predecessor's PRE_COMPACT hook.
            if attempt + 1 < self.config.find_parent_attempts {
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        }
    }

    fn set_status_logged(&self, session_id: &str, status: SessionStatus) {
        if let Err(e) = self.sessions.set_status(session_id, status) {
            tracing::warn!(session_id, status = %status, error = %e, "status update failed");
        }
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 3)
        .map(|w| w.to_lowercase())
        .collect()
}
