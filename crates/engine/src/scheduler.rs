// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cron scheduler
//!
//! `compute_next_run` is the pure schedule math; the dispatcher loop
//! polls for due jobs, respects a global concurrency cap, dispatches by
//! action type, and maintains failure counters with auto-disable.

use crate::pipeline::PipelineExecutor;
use crate::runner::{AgentRunner, SpawnRequest};
use crate::EngineError;
use chrono::{DateTime, Utc};
use gobby_adapters::subprocess::{run_with_timeout, SHELL_COMMAND_TIMEOUT};
use gobby_core::{
    parse_iso, to_iso, utc_now_iso, AgentMode, Clock, CronActionType, CronJob, CronRunStatus,
    ScheduleType,
};
use gobby_storage::CronStore;
use serde_json::Value;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Next fire time for a job, or `None` when it will never fire.
///
/// - `cron`: interpreted in the job's timezone, strictly after
///   `max(last_run_at, now)`.
/// - `interval`: `(last_run_at or now) + interval_seconds`.
/// - `once`: `run_at` if still in the future.
/// - Disabled jobs never fire.
pub fn compute_next_run(job: &CronJob, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if !job.enabled {
        return None;
    }
    match job.schedule_type {
        ScheduleType::Cron => {
            let expr = job.cron_expr.as_deref()?;
            // The cron crate wants a seconds field first.
            let schedule = cron::Schedule::from_str(&format!("0 {expr}")).ok()?;
            let tz: chrono_tz::Tz = job.timezone.parse().unwrap_or(chrono_tz::UTC);
            let after = job
                .last_run_at
                .as_deref()
                .and_then(parse_iso)
                .map(|last| last.max(now))
                .unwrap_or(now);
            schedule
                .after(&after.with_timezone(&tz))
                .next()
                .map(|next| next.with_timezone(&Utc))
        }
        ScheduleType::Interval => {
            let seconds = job.interval_seconds?;
            let base = job.last_run_at.as_deref().and_then(parse_iso).unwrap_or(now);
            Some(base + chrono::Duration::seconds(seconds as i64))
        }
        ScheduleType::Once => {
            let at = parse_iso(job.run_at.as_deref()?)?;
            (at > now).then_some(at)
        }
    }
}

/// Dispatcher configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub poll_interval: Duration,
    /// Global cap on concurrently running cron runs.
    pub max_concurrent_runs: usize,
    /// Consecutive failures before a job is auto-disabled.
    pub auto_disable_after: u32,
    /// Retention for finished run rows.
    pub run_retention_days: i64,
    /// Working directory for shell actions.
    pub workdir: PathBuf,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(15),
            max_concurrent_runs: 4,
            auto_disable_after: 5,
            run_retention_days: 30,
            workdir: PathBuf::from("."),
        }
    }
}

pub struct CronScheduler<C: Clock> {
    store: CronStore,
    runner: Option<Arc<AgentRunner>>,
    pipelines: Option<Arc<PipelineExecutor>>,
    clock: C,
    config: SchedulerConfig,
}

impl<C: Clock> CronScheduler<C> {
    pub fn new(
        store: CronStore,
        runner: Option<Arc<AgentRunner>>,
        pipelines: Option<Arc<PipelineExecutor>>,
        clock: C,
        config: SchedulerConfig,
    ) -> Self {
        Self { store, runner, pipelines, clock, config }
    }

    /// Poll-dispatch loop until cancelled. Old run rows are pruned on a
    /// slow secondary cadence.
    pub async fn run(&self, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(self.config.poll_interval);
        let mut cleanup = tokio::time::interval(Duration::from_secs(3600));
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("cron scheduler stopping");
                    return;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.tick().await {
                        tracing::error!(error = %e, "cron tick failed");
                    }
                }
                _ = cleanup.tick() => {
                    match self.cleanup_old_runs() {
                        Ok(0) => {}
                        Ok(deleted) => tracing::info!(deleted, "pruned old cron runs"),
                        Err(e) => tracing::warn!(error = %e, "cron run cleanup failed"),
                    }
                }
            }
        }
    }

    /// One poll: dispatch every due job within the concurrency cap.
    pub async fn tick(&self) -> Result<(), EngineError> {
        let now = self.clock.utc_now();
        let due = self.store.due_jobs(&to_iso(now))?;
        for job in due {
            if self.store.count_running()? >= self.config.max_concurrent_runs {
                tracing::debug!("cron concurrency cap reached; deferring");
                break;
            }
            self.dispatch(job, now).await?;
        }
        Ok(())
    }

    async fn dispatch(&self, mut job: CronJob, now: DateTime<Utc>) -> Result<(), EngineError> {
        let run = self.store.create_run(&job.id)?;
        self.store.mark_run_started(&run.id)?;
        tracing::info!(job = %job.name, run = %run.id, "dispatching cron job");

        let outcome = self.execute_action(&job).await;

        let (status, output, error, agent_run_id, pipeline_execution_id) = match outcome {
            Ok(result) => (
                CronRunStatus::Completed,
                result.output,
                None,
                result.agent_run_id,
                result.pipeline_execution_id,
            ),
            Err(e) => (CronRunStatus::Failed, None, Some(e.to_string()), None, None),
        };
        self.store.finish_run(
            &run.id,
            status,
            output.as_deref(),
            error.as_deref(),
            agent_run_id.as_deref(),
            pipeline_execution_id.as_deref(),
        )?;

        // Bookkeeping: last run, failure counter, next fire.
        job.last_run_at = Some(to_iso(now));
        job.last_status = Some(status.as_str().to_string());
        if status == CronRunStatus::Failed {
            job.consecutive_failures += 1;
            if job.consecutive_failures >= self.config.auto_disable_after {
                tracing::warn!(job = %job.name, "auto-disabling after repeated failures");
                job.enabled = false;
            }
        } else {
            job.consecutive_failures = 0;
        }
        job.next_run_at = compute_next_run(&job, now).map(to_iso);
        self.store.update(&job)?;
        Ok(())
    }

    async fn execute_action(&self, job: &CronJob) -> Result<ActionOutcome, EngineError> {
        match job.action_type {
            CronActionType::Shell => {
                let command = job
                    .action_config
                    .get("command")
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        EngineError::Validation("shell cron needs action_config.command".to_string())
                    })?;
                let output =
                    run_with_timeout(command, &self.config.workdir, &[], SHELL_COMMAND_TIMEOUT)
                        .await?;
                if !output.success() {
                    return Err(EngineError::Validation(format!(
                        "command exited {}: {}",
                        output.exit_code,
                        output.stderr.trim()
                    )));
                }
                Ok(ActionOutcome { output: Some(output.stdout), ..Default::default() })
            }
            CronActionType::AgentSpawn => {
                let runner = self.runner.as_ref().ok_or_else(|| {
                    EngineError::Validation("agent runner not configured".to_string())
                })?;
                let parent_session_id = job
                    .action_config
                    .get("parent_session_id")
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        EngineError::Validation(
                            "agent_spawn cron needs action_config.parent_session_id".to_string(),
                        )
                    })?;
                let request = SpawnRequest {
                    agent: job
                        .action_config
                        .get("agent")
                        .and_then(Value::as_str)
                        .unwrap_or("cron-agent")
                        .to_string(),
                    prompt: job
                        .action_config
                        .get("prompt")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    parent_session_id: parent_session_id.to_string(),
                    mode: job
                        .action_config
                        .get("mode")
                        .and_then(Value::as_str)
                        .and_then(AgentMode::parse),
                    ..Default::default()
                };
                let result = runner.spawn(request).await?;
                Ok(ActionOutcome {
                    agent_run_id: Some(result.run_id.to_string()),
                    ..Default::default()
                })
            }
            CronActionType::PipelineRun => {
                let pipelines = self.pipelines.as_ref().ok_or_else(|| {
                    EngineError::Validation("pipeline executor not configured".to_string())
                })?;
                let name = job
                    .action_config
                    .get("pipeline")
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        EngineError::Validation(
                            "pipeline_run cron needs action_config.pipeline".to_string(),
                        )
                    })?;
                let inputs = job
                    .action_config
                    .get("inputs")
                    .and_then(Value::as_object)
                    .cloned()
                    .unwrap_or_default();
                let execution = pipelines
                    .run(name, inputs, Some(&job.project_id), None)
                    .await?;
                Ok(ActionOutcome {
                    pipeline_execution_id: Some(execution.id.to_string()),
                    ..Default::default()
                })
            }
        }
    }

    /// Delete finished runs past retention.
    pub fn cleanup_old_runs(&self) -> Result<usize, EngineError> {
        let cutoff = self.clock.utc_now() - chrono::Duration::days(self.config.run_retention_days);
        Ok(self.store.cleanup_old_runs(&to_iso(cutoff))?)
    }
}

#[derive(Default)]
struct ActionOutcome {
    output: Option<String>,
    agent_run_id: Option<String>,
    pipeline_execution_id: Option<String>,
}

/// Stamp a fresh job's `next_run_at` at creation/edit time.
pub fn stamp_next_run(job: &mut CronJob) {
    let now = Utc::now();
    job.next_run_at = compute_next_run(job, now).map(to_iso);
    job.updated_at = utc_now_iso();
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
