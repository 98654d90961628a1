// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `gobby cron` subcommands
//!
//! Schedules accept a 5-field cron expression or an interval like
//! `300s`; validation happens client-side before the request so typos
//! fail fast with a non-zero exit.

use crate::client::DaemonClient;
use crate::output;
use anyhow::{anyhow, bail, Result};
use clap::Subcommand;
use serde_json::{json, Value};

#[derive(Subcommand)]
pub enum CronCommand {
    /// List jobs.
    List {
        #[arg(long)]
        project_id: Option<String>,
    },
    /// Add a job.
    Add {
        name: String,
        /// 5-field cron expression or interval like "300s".
        #[arg(long)]
        schedule: String,
        #[arg(long)]
        project_id: String,
        /// shell | agent_spawn | pipeline_run
        #[arg(long)]
        action_type: String,
        /// JSON action configuration.
        #[arg(long, default_value = "{}")]
        action_config: String,
        #[arg(long)]
        timezone: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Mark a job due now.
    Run {
        reference: String,
        #[arg(long)]
        project_id: String,
    },
    /// Enable/disable a job.
    Toggle {
        reference: String,
        #[arg(long)]
        project_id: String,
    },
    /// Show run history.
    Runs {
        reference: String,
        #[arg(long)]
        project_id: String,
    },
    /// Delete a job and its runs.
    Remove {
        reference: String,
        #[arg(long)]
        project_id: String,
    },
    /// Edit schedule or configuration.
    Edit {
        reference: String,
        #[arg(long)]
        project_id: String,
        #[arg(long)]
        schedule: Option<String>,
        #[arg(long)]
        action_config: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
}

pub async fn run(client: &DaemonClient, command: CronCommand, json: bool) -> Result<()> {
    match command {
        CronCommand::List { project_id } => {
            let path = match project_id {
                Some(project_id) => format!("/api/cron/jobs?project_id={project_id}"),
                None => "/api/cron/jobs".to_string(),
            };
            let body = client.get(&path).await?;
            if json {
                output::emit(true, &body);
                return Ok(());
            }
            let rows: Vec<Vec<String>> = body["jobs"]
                .as_array()
                .map(|jobs| {
                    jobs.iter()
                        .map(|job| {
                            vec![
                                output::field(job, &["name"]),
                                output::field(job, &["schedule_type"]),
                                schedule_text(job),
                                output::field(job, &["enabled"]),
                                output::field(job, &["next_run_at"]),
                                output::field(job, &["last_status"]),
                            ]
                        })
                        .collect()
                })
                .unwrap_or_default();
            output::table(&["NAME", "TYPE", "SCHEDULE", "ENABLED", "NEXT RUN", "LAST"], &rows);
            Ok(())
        }
        CronCommand::Add {
            name,
            schedule,
            project_id,
            action_type,
            action_config,
            timezone,
            description,
        } => {
            // Fail fast on obviously invalid input.
            gobby_workflow::parse_schedule(&schedule).map_err(|e| anyhow!(e.to_string()))?;
            let action_config: Value = serde_json::from_str(&action_config)
                .map_err(|e| anyhow!("invalid --action-config JSON: {e}"))?;
            if gobby_core::CronActionType::parse(&action_type).is_none() {
                bail!("unknown action type: {action_type}");
            }
            let body = client
                .post(
                    "/api/cron/jobs",
                    json!({
                        "project_id": project_id,
                        "name": name,
                        "schedule": schedule,
                        "action_type": action_type,
                        "action_config": action_config,
                        "timezone": timezone,
                        "description": description,
                    }),
                )
                .await?;
            output::emit(json, &body);
            if !json {
                println!("added {} ({})", output::field(&body, &["job", "name"]), output::field(&body, &["job", "id"]));
            }
            Ok(())
        }
        CronCommand::Run { reference, project_id } => {
            let body = client
                .post(&format!("/api/cron/jobs/{reference}/run?project_id={project_id}"), json!({}))
                .await?;
            output::emit(json, &body);
            if !json {
                println!("queued {reference}");
            }
            Ok(())
        }
        CronCommand::Toggle { reference, project_id } => {
            let body = client
                .post(
                    &format!("/api/cron/jobs/{reference}/toggle?project_id={project_id}"),
                    json!({}),
                )
                .await?;
            output::emit(json, &body);
            if !json {
                println!(
                    "{} is now enabled={}",
                    reference,
                    output::field(&body, &["job", "enabled"])
                );
            }
            Ok(())
        }
        CronCommand::Runs { reference, project_id } => {
            let body = client
                .get(&format!("/api/cron/jobs/{reference}/runs?project_id={project_id}"))
                .await?;
            if json {
                output::emit(true, &body);
                return Ok(());
            }
            let rows: Vec<Vec<String>> = body["runs"]
                .as_array()
                .map(|runs| {
                    runs.iter()
                        .map(|run| {
                            vec![
                                output::field(run, &["id"]),
                                output::field(run, &["status"]),
                                output::field(run, &["triggered_at"]),
                                output::field(run, &["error"]),
                            ]
                        })
                        .collect()
                })
                .unwrap_or_default();
            output::table(&["RUN", "STATUS", "TRIGGERED", "ERROR"], &rows);
            Ok(())
        }
        CronCommand::Remove { reference, project_id } => {
            let body = client
                .delete(&format!("/api/cron/jobs/{reference}?project_id={project_id}"))
                .await?;
            output::emit(json, &body);
            if !json {
                println!("removed {reference}");
            }
            Ok(())
        }
        CronCommand::Edit { reference, project_id, schedule, action_config, description } => {
            if let Some(schedule) = &schedule {
                gobby_workflow::parse_schedule(schedule).map_err(|e| anyhow!(e.to_string()))?;
            }
            let action_config: Option<Value> = match action_config {
                Some(text) => Some(
                    serde_json::from_str(&text)
                        .map_err(|e| anyhow!("invalid --action-config JSON: {e}"))?,
                ),
                None => None,
            };
            let body = client
                .patch(
                    &format!("/api/cron/jobs/{reference}?project_id={project_id}"),
                    json!({
                        "project_id": project_id,
                        "schedule": schedule,
                        "action_config": action_config,
                        "description": description,
                    }),
                )
                .await?;
            output::emit(json, &body);
            if !json {
                println!(
                    "updated {}: next run {}",
                    reference,
                    output::field(&body, &["job", "next_run_at"])
                );
            }
            Ok(())
        }
    }
}

fn schedule_text(job: &Value) -> String {
    if let Some(expr) = job.get("cron_expr").and_then(Value::as_str) {
        return expr.to_string();
    }
    if let Some(seconds) = job.get("interval_seconds").and_then(Value::as_u64) {
        return format!("{seconds}s");
    }
    output::field(job, &["run_at"])
}

#[cfg(test)]
#[path = "cron_tests.rs"]
mod tests;
