// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cron job and run records
//!
//! A job carries exactly one schedule field matching its `schedule_type`;
//! [`CronJob::validate_schedule`] is the invariant check run on create and
//! edit.

use crate::id::{IdTag, TaggedId};
use serde::{Deserialize, Serialize};

/// Id family for cron jobs, tagged `cj`.
pub struct CronJobTag;

impl IdTag for CronJobTag {
    const TAG: &'static str = "cj";
}

pub type CronJobId = TaggedId<CronJobTag>;

/// Id family for cron runs, tagged `cr`.
pub struct CronRunTag;

impl IdTag for CronRunTag {
    const TAG: &'static str = "cr";
}

pub type CronRunId = TaggedId<CronRunTag>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleType {
    Cron,
    Interval,
    Once,
}

impl ScheduleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cron => "cron",
            Self::Interval => "interval",
            Self::Once => "once",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "cron" => Some(Self::Cron),
            "interval" => Some(Self::Interval),
            "once" => Some(Self::Once),
            _ => None,
        }
    }
}

/// What a due job dispatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CronActionType {
    Shell,
    AgentSpawn,
    PipelineRun,
}

impl CronActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Shell => "shell",
            Self::AgentSpawn => "agent_spawn",
            Self::PipelineRun => "pipeline_run",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "shell" => Some(Self::Shell),
            "agent_spawn" => Some(Self::AgentSpawn),
            "pipeline_run" => Some(Self::PipelineRun),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CronJob {
    pub id: CronJobId,
    pub project_id: String,
    pub name: String,
    pub schedule_type: ScheduleType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cron_expr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_seconds: Option<u64>,
    /// One-shot fire time, UTC ISO-8601.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_at: Option<String>,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    pub action_type: CronActionType,
    /// Action-specific configuration (command, agent name, pipeline inputs).
    pub action_config: serde_json::Value,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_run_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_status: Option<String>,
    #[serde(default)]
    pub consecutive_failures: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_true() -> bool {
    true
}

impl CronJob {
    /// Check that exactly one schedule field is set and matches the type.
    pub fn validate_schedule(&self) -> Result<(), String> {
        let fields = [
            self.cron_expr.is_some(),
            self.interval_seconds.is_some(),
            self.run_at.is_some(),
        ];
        let set = fields.iter().filter(|b| **b).count();
        if set != 1 {
            return Err(format!("exactly one schedule field must be set, found {set}"));
        }
        let matches_type = match self.schedule_type {
            ScheduleType::Cron => self.cron_expr.is_some(),
            ScheduleType::Interval => self.interval_seconds.is_some(),
            ScheduleType::Once => self.run_at.is_some(),
        };
        if !matches_type {
            return Err(format!(
                "schedule field does not match schedule_type {}",
                self.schedule_type.as_str()
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CronRunStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl CronRunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CronRun {
    pub id: CronRunId,
    pub cron_job_id: CronJobId,
    pub triggered_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    pub status: CronRunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_run_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline_execution_id: Option<String>,
    pub created_at: String,
}

#[cfg(test)]
#[path = "cron_tests.rs"]
mod tests;
