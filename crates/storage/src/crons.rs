// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cron job and run store

use crate::{Database, StorageError};
use gobby_core::{
    utc_now_iso, CronActionType, CronJob, CronJobId, CronRun, CronRunId, CronRunStatus,
    ScheduleType,
};
use rusqlite::{params, OptionalExtension, Row};
use std::sync::Arc;

#[derive(Clone)]
pub struct CronStore {
    db: Arc<Database>,
}

const JOB_COLS: &str = "id, project_id, name, schedule_type, cron_expr, interval_seconds, run_at, \
                        timezone, action_type, action_config, enabled, next_run_at, last_run_at, \
                        last_status, consecutive_failures, description, created_at, updated_at";

const RUN_COLS: &str = "id, cron_job_id, triggered_at, started_at, completed_at, status, output, \
                        error, agent_run_id, pipeline_execution_id, created_at";

fn row_to_job(row: &Row) -> rusqlite::Result<CronJob> {
    let id: String = row.get(0)?;
    let schedule_type: String = row.get(3)?;
    let action_type: String = row.get(8)?;
    let action_config: String = row.get(9)?;
    let interval: Option<i64> = row.get(5)?;
    Ok(CronJob {
        id: CronJobId::from_string(id),
        project_id: row.get(1)?,
        name: row.get(2)?,
        schedule_type: ScheduleType::parse(&schedule_type).unwrap_or(ScheduleType::Interval),
        cron_expr: row.get(4)?,
        interval_seconds: interval.map(|i| i as u64),
        run_at: row.get(6)?,
        timezone: row.get(7)?,
        action_type: CronActionType::parse(&action_type).unwrap_or(CronActionType::Shell),
        action_config: serde_json::from_str(&action_config)
            .unwrap_or(serde_json::Value::Null),
        enabled: row.get::<_, i64>(10)? != 0,
        next_run_at: row.get(11)?,
        last_run_at: row.get(12)?,
        last_status: row.get(13)?,
        consecutive_failures: row.get::<_, i64>(14)? as u32,
        description: row.get(15)?,
        created_at: row.get(16)?,
        updated_at: row.get(17)?,
    })
}

fn row_to_run(row: &Row) -> rusqlite::Result<CronRun> {
    let id: String = row.get(0)?;
    let job_id: String = row.get(1)?;
    let status: String = row.get(5)?;
    Ok(CronRun {
        id: CronRunId::from_string(id),
        cron_job_id: CronJobId::from_string(job_id),
        triggered_at: row.get(2)?,
        started_at: row.get(3)?,
        completed_at: row.get(4)?,
        status: CronRunStatus::parse(&status).unwrap_or(CronRunStatus::Pending),
        output: row.get(6)?,
        error: row.get(7)?,
        agent_run_id: row.get(8)?,
        pipeline_execution_id: row.get(9)?,
        created_at: row.get(10)?,
    })
}

impl CronStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert a job after validating its schedule invariant.
    pub fn create(&self, job: &CronJob) -> Result<(), StorageError> {
        job.validate_schedule().map_err(StorageError::Validation)?;
        let action_config = serde_json::to_string(&job.action_config)?;
        self.db.with_conn(|conn| {
            conn.execute(
                r#"
                INSERT INTO cron_jobs (
                    id, project_id, name, schedule_type, cron_expr, interval_seconds,
                    run_at, timezone, action_type, action_config, enabled, next_run_at,
                    last_run_at, last_status, consecutive_failures, description,
                    created_at, updated_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12,
                        ?13, ?14, ?15, ?16, ?17, ?18)
                "#,
                params![
                    job.id.as_str(),
                    job.project_id,
                    job.name,
                    job.schedule_type.as_str(),
                    job.cron_expr,
                    job.interval_seconds.map(|i| i as i64),
                    job.run_at,
                    job.timezone,
                    job.action_type.as_str(),
                    action_config,
                    job.enabled as i64,
                    job.next_run_at,
                    job.last_run_at,
                    job.last_status,
                    job.consecutive_failures as i64,
                    job.description,
                    job.created_at,
                    job.updated_at,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get(&self, id: &CronJobId) -> Result<CronJob, StorageError> {
        self.db.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {JOB_COLS} FROM cron_jobs WHERE id = ?1"),
                params![id.as_str()],
                row_to_job,
            )
            .optional()?
            .ok_or_else(|| StorageError::not_found("cron_job", id.as_str()))
        })
    }

    /// Resolve a job by id or by `(project, name)`.
    pub fn resolve(&self, reference: &str, project_id: &str) -> Result<CronJob, StorageError> {
        if CronJobId::is_tagged(reference) {
            return self.get(&CronJobId::from_string(reference));
        }
        self.db.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {JOB_COLS} FROM cron_jobs WHERE project_id = ?1 AND name = ?2"),
                params![project_id, reference],
                row_to_job,
            )
            .optional()?
            .ok_or_else(|| StorageError::not_found("cron_job", reference))
        })
    }

    pub fn list(&self, project_id: Option<&str>) -> Result<Vec<CronJob>, StorageError> {
        self.db.with_conn(|conn| {
            let jobs = match project_id {
                Some(project_id) => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {JOB_COLS} FROM cron_jobs WHERE project_id = ?1 ORDER BY name"
                    ))?;
                    let rows = stmt
                        .query_map(params![project_id], row_to_job)?
                        .collect::<Result<Vec<_>, _>>()?;
                    rows
                }
                None => {
                    let mut stmt = conn
                        .prepare(&format!("SELECT {JOB_COLS} FROM cron_jobs ORDER BY name"))?;
                    let rows = stmt
                        .query_map([], row_to_job)?
                        .collect::<Result<Vec<_>, _>>()?;
                    rows
                }
            };
            Ok(jobs)
        })
    }

    /// Persist edited schedule/config fields after revalidation.
    pub fn update(&self, job: &CronJob) -> Result<(), StorageError> {
        job.validate_schedule().map_err(StorageError::Validation)?;
        let action_config = serde_json::to_string(&job.action_config)?;
        let now = utc_now_iso();
        self.db.with_conn(|conn| {
            let changed = conn.execute(
                r#"
                UPDATE cron_jobs SET
                    name = ?2, schedule_type = ?3, cron_expr = ?4, interval_seconds = ?5,
                    run_at = ?6, timezone = ?7, action_type = ?8, action_config = ?9,
                    enabled = ?10, next_run_at = ?11, last_run_at = ?12, last_status = ?13,
                    consecutive_failures = ?14, description = ?15, updated_at = ?16
                WHERE id = ?1
                "#,
                params![
                    job.id.as_str(),
                    job.name,
                    job.schedule_type.as_str(),
                    job.cron_expr,
                    job.interval_seconds.map(|i| i as i64),
                    job.run_at,
                    job.timezone,
                    job.action_type.as_str(),
                    action_config,
                    job.enabled as i64,
                    job.next_run_at,
                    job.last_run_at,
                    job.last_status,
                    job.consecutive_failures as i64,
                    job.description,
                    now,
                ],
            )?;
            if changed == 0 {
                return Err(StorageError::not_found("cron_job", job.id.as_str()));
            }
            Ok(())
        })
    }

    pub fn delete(&self, id: &CronJobId) -> Result<(), StorageError> {
        self.db.with_tx(|tx| {
            tx.execute("DELETE FROM cron_runs WHERE cron_job_id = ?1", params![id.as_str()])?;
            let changed =
                tx.execute("DELETE FROM cron_jobs WHERE id = ?1", params![id.as_str()])?;
            if changed == 0 {
                return Err(StorageError::not_found("cron_job", id.as_str()));
            }
            Ok(())
        })
    }

    /// Enabled jobs whose `next_run_at` is at or before `now_iso`.
    pub fn due_jobs(&self, now_iso: &str) -> Result<Vec<CronJob>, StorageError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {JOB_COLS} FROM cron_jobs \
                 WHERE enabled = 1 AND next_run_at IS NOT NULL AND next_run_at <= ?1 \
                 ORDER BY next_run_at"
            ))?;
            let jobs = stmt
                .query_map(params![now_iso], row_to_job)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(jobs)
        })
    }

    // -- runs ---------------------------------------------------------------

    pub fn create_run(&self, job_id: &CronJobId) -> Result<CronRun, StorageError> {
        let id = CronRunId::new();
        let now = utc_now_iso();
        self.db.with_conn(|conn| {
            conn.execute(
                r#"
                INSERT INTO cron_runs (id, cron_job_id, triggered_at, status, created_at)
                VALUES (?1, ?2, ?3, 'pending', ?3)
                "#,
                params![id.as_str(), job_id.as_str(), now],
            )?;
            Ok(())
        })?;
        self.get_run(&id)
    }

    pub fn get_run(&self, id: &CronRunId) -> Result<CronRun, StorageError> {
        self.db.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {RUN_COLS} FROM cron_runs WHERE id = ?1"),
                params![id.as_str()],
                row_to_run,
            )
            .optional()?
            .ok_or_else(|| StorageError::not_found("cron_run", id.as_str()))
        })
    }

    pub fn mark_run_started(&self, id: &CronRunId) -> Result<(), StorageError> {
        let now = utc_now_iso();
        self.db.with_conn(|conn| {
            conn.execute(
                "UPDATE cron_runs SET status = 'running', started_at = ?2 WHERE id = ?1",
                params![id.as_str(), now],
            )?;
            Ok(())
        })
    }

    pub fn finish_run(
        &self,
        id: &CronRunId,
        status: CronRunStatus,
        output: Option<&str>,
        error: Option<&str>,
        agent_run_id: Option<&str>,
        pipeline_execution_id: Option<&str>,
    ) -> Result<(), StorageError> {
        let now = utc_now_iso();
        self.db.with_conn(|conn| {
            conn.execute(
                "UPDATE cron_runs SET status = ?2, output = ?3, error = ?4, \
                 agent_run_id = ?5, pipeline_execution_id = ?6, completed_at = ?7 \
                 WHERE id = ?1",
                params![
                    id.as_str(),
                    status.as_str(),
                    output,
                    error,
                    agent_run_id,
                    pipeline_execution_id,
                    now
                ],
            )?;
            Ok(())
        })
    }

    pub fn list_runs(&self, job_id: &CronJobId, limit: usize) -> Result<Vec<CronRun>, StorageError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {RUN_COLS} FROM cron_runs \
                 WHERE cron_job_id = ?1 ORDER BY triggered_at DESC LIMIT ?2"
            ))?;
            let runs = stmt
                .query_map(params![job_id.as_str(), limit as i64], row_to_run)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(runs)
        })
    }

    /// Count runs currently pending or running, for the global
    /// concurrency cap.
    pub fn count_running(&self) -> Result<usize, StorageError> {
        self.db.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM cron_runs WHERE status IN ('pending', 'running')",
                [],
                |row| row.get(0),
            )?;
            Ok(count as usize)
        })
    }

    /// Delete runs older than the retention window.
    pub fn cleanup_old_runs(&self, cutoff_iso: &str) -> Result<usize, StorageError> {
        self.db.with_conn(|conn| {
            let deleted = conn.execute(
                "DELETE FROM cron_runs WHERE triggered_at < ?1 \
                 AND status IN ('completed', 'failed')",
                params![cutoff_iso],
            )?;
            Ok(deleted)
        })
    }
}

#[cfg(test)]
#[path = "crons_tests.rs"]
mod tests;
