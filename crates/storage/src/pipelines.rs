// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pipeline execution store

use crate::{Database, StorageError};
use gobby_core::{
    new_uuid, utc_now_iso, PipelineExecution, PipelineExecutionId, PipelineStatus, StepExecution,
    StepExecutionStatus,
};
use rusqlite::{params, OptionalExtension, Row};
use std::sync::Arc;

#[derive(Clone)]
pub struct PipelineStore {
    db: Arc<Database>,
}

const EXEC_COLS: &str = "id, pipeline_name, project_id, status, inputs_json, outputs_json, \
                         resume_token, session_id, parent_execution_id, created_at, updated_at, \
                         completed_at";

const STEP_COLS: &str = "id, execution_id, step_id, status, started_at, completed_at, \
                         input_json, output_json, error, approval_token, approved_by, approved_at";

fn row_to_execution(row: &Row) -> rusqlite::Result<PipelineExecution> {
    let id: String = row.get(0)?;
    let status: String = row.get(3)?;
    let parent: Option<String> = row.get(8)?;
    Ok(PipelineExecution {
        id: PipelineExecutionId::from_string(id),
        pipeline_name: row.get(1)?,
        project_id: row.get(2)?,
        status: PipelineStatus::parse(&status).unwrap_or(PipelineStatus::Pending),
        inputs_json: row.get(4)?,
        outputs_json: row.get(5)?,
        resume_token: row.get(6)?,
        session_id: row.get(7)?,
        parent_execution_id: parent.map(PipelineExecutionId::from_string),
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
        completed_at: row.get(11)?,
    })
}

fn row_to_step(row: &Row) -> rusqlite::Result<StepExecution> {
    let execution_id: String = row.get(1)?;
    let status: String = row.get(3)?;
    Ok(StepExecution {
        id: row.get(0)?,
        execution_id: PipelineExecutionId::from_string(execution_id),
        step_id: row.get(2)?,
        status: StepExecutionStatus::parse(&status).unwrap_or(StepExecutionStatus::Pending),
        started_at: row.get(4)?,
        completed_at: row.get(5)?,
        input_json: row.get(6)?,
        output_json: row.get(7)?,
        error: row.get(8)?,
        approval_token: row.get(9)?,
        approved_by: row.get(10)?,
        approved_at: row.get(11)?,
    })
}

impl PipelineStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn create_execution(
        &self,
        pipeline_name: &str,
        project_id: Option<&str>,
        inputs_json: Option<&str>,
        session_id: Option<&str>,
        parent_execution_id: Option<&PipelineExecutionId>,
    ) -> Result<PipelineExecution, StorageError> {
        let id = PipelineExecutionId::new();
        let now = utc_now_iso();
        self.db.with_conn(|conn| {
            conn.execute(
                r#"
                INSERT INTO pipeline_executions (
                    id, pipeline_name, project_id, status, inputs_json,
                    session_id, parent_execution_id, created_at, updated_at
                )
                VALUES (?1, ?2, ?3, 'pending', ?4, ?5, ?6, ?7, ?7)
                "#,
                params![
                    id.as_str(),
                    pipeline_name,
                    project_id,
                    inputs_json,
                    session_id,
                    parent_execution_id.map(|p| p.as_str().to_string()),
                    now,
                ],
            )?;
            Ok(())
        })?;
        self.get_execution(&id)
    }

    pub fn get_execution(
        &self,
        id: &PipelineExecutionId,
    ) -> Result<PipelineExecution, StorageError> {
        self.db.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {EXEC_COLS} FROM pipeline_executions WHERE id = ?1"),
                params![id.as_str()],
                row_to_execution,
            )
            .optional()?
            .ok_or_else(|| StorageError::not_found("pipeline_execution", id.as_str()))
        })
    }

    pub fn set_execution_status(
        &self,
        id: &PipelineExecutionId,
        status: PipelineStatus,
    ) -> Result<(), StorageError> {
        let now = utc_now_iso();
        let completed_at = status.is_terminal().then(|| now.clone());
        self.db.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE pipeline_executions \
                 SET status = ?2, updated_at = ?3, completed_at = COALESCE(?4, completed_at) \
                 WHERE id = ?1",
                params![id.as_str(), status.as_str(), now, completed_at],
            )?;
            if changed == 0 {
                return Err(StorageError::not_found("pipeline_execution", id.as_str()));
            }
            Ok(())
        })
    }

    pub fn set_resume_token(
        &self,
        id: &PipelineExecutionId,
        token: Option<&str>,
    ) -> Result<(), StorageError> {
        let now = utc_now_iso();
        self.db.with_conn(|conn| {
            conn.execute(
                "UPDATE pipeline_executions SET resume_token = ?2, updated_at = ?3 WHERE id = ?1",
                params![id.as_str(), token, now],
            )?;
            Ok(())
        })
    }

    pub fn set_outputs(
        &self,
        id: &PipelineExecutionId,
        outputs_json: &str,
    ) -> Result<(), StorageError> {
        let now = utc_now_iso();
        self.db.with_conn(|conn| {
            conn.execute(
                "UPDATE pipeline_executions SET outputs_json = ?2, updated_at = ?3 WHERE id = ?1",
                params![id.as_str(), outputs_json, now],
            )?;
            Ok(())
        })
    }

    /// Look up a waiting execution by its resume token.
    pub fn find_by_token(&self, token: &str) -> Result<Option<PipelineExecution>, StorageError> {
        self.db.with_conn(|conn| {
            Ok(conn
                .query_row(
                    &format!("SELECT {EXEC_COLS} FROM pipeline_executions WHERE resume_token = ?1"),
                    params![token],
                    row_to_execution,
                )
                .optional()?)
        })
    }

    // -- steps --------------------------------------------------------------

    pub fn create_step(
        &self,
        execution_id: &PipelineExecutionId,
        step_id: &str,
        input_json: Option<&str>,
    ) -> Result<StepExecution, StorageError> {
        let id = new_uuid();
        self.db.with_conn(|conn| {
            conn.execute(
                r#"
                INSERT INTO step_executions (id, execution_id, step_id, status, input_json)
                VALUES (?1, ?2, ?3, 'pending', ?4)
                ON CONFLICT (execution_id, step_id) DO NOTHING
                "#,
                params![id, execution_id.as_str(), step_id, input_json],
            )?;
            Ok(())
        })?;
        self.get_step(execution_id, step_id)
    }

    pub fn get_step(
        &self,
        execution_id: &PipelineExecutionId,
        step_id: &str,
    ) -> Result<StepExecution, StorageError> {
        self.db.with_conn(|conn| {
            conn.query_row(
                &format!(
                    "SELECT {STEP_COLS} FROM step_executions \
                     WHERE execution_id = ?1 AND step_id = ?2"
                ),
                params![execution_id.as_str(), step_id],
                row_to_step,
            )
            .optional()?
            .ok_or_else(|| StorageError::not_found("step_execution", step_id))
        })
    }

    pub fn list_steps(
        &self,
        execution_id: &PipelineExecutionId,
    ) -> Result<Vec<StepExecution>, StorageError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {STEP_COLS} FROM step_executions \
                 WHERE execution_id = ?1 ORDER BY rowid"
            ))?;
            let steps = stmt
                .query_map(params![execution_id.as_str()], row_to_step)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(steps)
        })
    }

    pub fn mark_step_running(
        &self,
        execution_id: &PipelineExecutionId,
        step_id: &str,
    ) -> Result<(), StorageError> {
        let now = utc_now_iso();
        self.db.with_conn(|conn| {
            conn.execute(
                "UPDATE step_executions SET status = 'running', started_at = ?3 \
                 WHERE execution_id = ?1 AND step_id = ?2",
                params![execution_id.as_str(), step_id, now],
            )?;
            Ok(())
        })
    }

    pub fn finish_step(
        &self,
        execution_id: &PipelineExecutionId,
        step_id: &str,
        status: StepExecutionStatus,
        output_json: Option<&str>,
        error: Option<&str>,
    ) -> Result<(), StorageError> {
        let now = utc_now_iso();
        self.db.with_conn(|conn| {
            conn.execute(
                "UPDATE step_executions \
                 SET status = ?3, output_json = ?4, error = ?5, completed_at = ?6 \
                 WHERE execution_id = ?1 AND step_id = ?2",
                params![
                    execution_id.as_str(),
                    step_id,
                    status.as_str(),
                    output_json,
                    error,
                    now
                ],
            )?;
            Ok(())
        })
    }

    pub fn set_step_waiting_approval(
        &self,
        execution_id: &PipelineExecutionId,
        step_id: &str,
        approval_token: &str,
    ) -> Result<(), StorageError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "UPDATE step_executions \
                 SET status = 'waiting_approval', approval_token = ?3 \
                 WHERE execution_id = ?1 AND step_id = ?2",
                params![execution_id.as_str(), step_id, approval_token],
            )?;
            Ok(())
        })
    }

    pub fn record_step_approval(
        &self,
        execution_id: &PipelineExecutionId,
        step_id: &str,
        approved_by: Option<&str>,
    ) -> Result<(), StorageError> {
        let now = utc_now_iso();
        self.db.with_conn(|conn| {
            conn.execute(
                "UPDATE step_executions \
                 SET approved_by = ?3, approved_at = ?4, approval_token = NULL \
                 WHERE execution_id = ?1 AND step_id = ?2",
                params![execution_id.as_str(), step_id, approved_by, now],
            )?;
            Ok(())
        })
    }

    /// The step currently waiting for approval on an execution.
    pub fn find_waiting_step(
        &self,
        execution_id: &PipelineExecutionId,
    ) -> Result<Option<StepExecution>, StorageError> {
        self.db.with_conn(|conn| {
            Ok(conn
                .query_row(
                    &format!(
                        "SELECT {STEP_COLS} FROM step_executions \
                         WHERE execution_id = ?1 AND status = 'waiting_approval' \
                         ORDER BY rowid LIMIT 1"
                    ),
                    params![execution_id.as_str()],
                    row_to_step,
                )
                .optional()?)
        })
    }
}

#[cfg(test)]
#[path = "pipelines_tests.rs"]
mod tests;
