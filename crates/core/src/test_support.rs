// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test builders shared across crates
//!
//! Gated behind the `test-support` feature so downstream crates can build
//! fixture entities without repeating field soup.

use crate::event::{HookEvent, HookEventType, SessionSource};
use crate::session::{Session, SessionStatus};
use crate::task::{Task, TaskStatus};
use crate::time_fmt::utc_now_iso;

/// Builder for [`Session`] fixtures.
pub struct SessionBuilder {
    session: Session,
}

impl SessionBuilder {
    pub fn new() -> Self {
        let now = utc_now_iso();
        Self {
            session: Session {
                id: crate::new_uuid(),
                external_id: "ext-1".to_string(),
                machine_id: "machine-1".to_string(),
                source: SessionSource::Claude,
                project_id: "project-1".to_string(),
                title: None,
                status: SessionStatus::Active,
                jsonl_path: None,
                summary_markdown: None,
                compact_markdown: None,
                git_branch: None,
                parent_session_id: None,
                agent_depth: 0,
                created_at: now.clone(),
                updated_at: now,
                transcript_processed: false,
            },
        }
    }

    pub fn external_id(mut self, v: impl Into<String>) -> Self {
        self.session.external_id = v.into();
        self
    }

    pub fn machine_id(mut self, v: impl Into<String>) -> Self {
        self.session.machine_id = v.into();
        self
    }

    pub fn source(mut self, v: SessionSource) -> Self {
        self.session.source = v;
        self
    }

    pub fn project_id(mut self, v: impl Into<String>) -> Self {
        self.session.project_id = v.into();
        self
    }

    pub fn status(mut self, v: SessionStatus) -> Self {
        self.session.status = v;
        self
    }

    pub fn parent(mut self, v: impl Into<String>) -> Self {
        self.session.parent_session_id = Some(v.into());
        self
    }

    pub fn depth(mut self, v: u32) -> Self {
        self.session.agent_depth = v;
        self
    }

    pub fn build(self) -> Session {
        self.session
    }
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for [`Task`] fixtures.
pub struct TaskBuilder {
    task: Task,
}

impl TaskBuilder {
    pub fn new(title: impl Into<String>) -> Self {
        let now = utc_now_iso();
        Self {
            task: Task {
                id: crate::new_uuid(),
                seq_num: 1,
                project_id: "project-1".to_string(),
                title: title.into(),
                description: None,
                status: TaskStatus::Open,
                priority: "medium".to_string(),
                task_type: "task".to_string(),
                category: None,
                parent_task_id: None,
                commits: Vec::new(),
                validation_criteria: None,
                validation_status: None,
                expansion_status: None,
                expansion_context: None,
                requires_user_review: false,
                labels: Vec::new(),
                created_at: now.clone(),
                updated_at: now,
            },
        }
    }

    pub fn project_id(mut self, v: impl Into<String>) -> Self {
        self.task.project_id = v.into();
        self
    }

    pub fn seq_num(mut self, v: i64) -> Self {
        self.task.seq_num = v;
        self
    }

    pub fn parent(mut self, v: impl Into<String>) -> Self {
        self.task.parent_task_id = Some(v.into());
        self
    }

    pub fn status(mut self, v: TaskStatus) -> Self {
        self.task.status = v;
        self
    }

    pub fn build(self) -> Task {
        self.task
    }
}

/// A minimal hook event for tests.
pub fn hook_event(event_type: HookEventType, external_id: &str) -> HookEvent {
    let mut event = HookEvent::new(event_type, "machine-1", SessionSource::Claude);
    event.external_id = Some(external_id.to_string());
    event
}
