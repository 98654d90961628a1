// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pipeline executor
//!
//! Executes pipeline definitions step by step: `exec` shells out,
//! `prompt` calls the LLM seam, `invoke_pipeline` recurses into a child
//! execution. An approval gate surfaces as `EngineError::ApprovalRequired`
//! carrying the resume token; `approve` is the only way to continue and
//! consumes the token (a second approval is not-found). Webhooks fire on
//! approval-pending, completion, and failure.

use crate::llm::{LlmRequest, LlmService};
use crate::webhooks::WebhookClient;
use crate::EngineError;
use gobby_adapters::subprocess::{run_with_timeout, SHELL_COMMAND_TIMEOUT};
use gobby_core::{
    PipelineExecution, PipelineExecutionId, PipelineStatus, StepExecutionStatus,
};
use gobby_storage::{PipelineStore, TaskStore};
use gobby_workflow::{vars, ConditionEvaluator, DefinitionLoader, PipelineDef, PipelineStepDef};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

pub struct PipelineExecutor {
    store: PipelineStore,
    loader: Arc<DefinitionLoader>,
    llm: Option<Arc<dyn LlmService>>,
    webhooks: WebhookClient,
    conditions: ConditionEvaluator,
    /// Working directory for exec steps.
    workdir: PathBuf,
}

impl PipelineExecutor {
    pub fn new(
        store: PipelineStore,
        tasks: TaskStore,
        loader: Arc<DefinitionLoader>,
        llm: Option<Arc<dyn LlmService>>,
        workdir: PathBuf,
    ) -> Self {
        Self {
            store,
            loader,
            llm,
            webhooks: WebhookClient::new(),
            conditions: crate::conditions::evaluator(tasks),
            workdir,
        }
    }

    pub fn store(&self) -> &PipelineStore {
        &self.store
    }

    /// Start a pipeline by name. Returns the completed execution, or
    /// `ApprovalRequired` when a gate fires.
    pub async fn run(
        &self,
        name: &str,
        inputs: Map<String, Value>,
        project_id: Option<&str>,
        session_id: Option<&str>,
    ) -> Result<PipelineExecution, EngineError> {
        let def = self
            .loader
            .get_pipeline(name)
            .ok_or_else(|| EngineError::NotFound("pipeline", name.to_string()))?;
        for required in &def.inputs {
            if !inputs.contains_key(required) {
                return Err(EngineError::Validation(format!(
                    "pipeline '{name}' requires input '{required}'"
                )));
            }
        }
        let inputs_json = serde_json::to_string(&inputs).map_err(gobby_storage::StorageError::from)?;
        let execution = self.store.create_execution(
            name,
            project_id,
            Some(&inputs_json),
            session_id,
            None,
        )?;
        self.execute_from(execution, def, 0).await
    }

    /// Resume the execution waiting on `token`. Idempotent-once: the
    /// token is consumed, so a second call is `NotFound`.
    pub async fn approve(
        &self,
        token: &str,
        approved_by: Option<&str>,
    ) -> Result<PipelineExecution, EngineError> {
        let execution = self
            .store
            .find_by_token(token)?
            .ok_or_else(|| EngineError::NotFound("approval token", token.to_string()))?;
        let waiting = self
            .store
            .find_waiting_step(&execution.id)?
            .ok_or_else(|| EngineError::NotFound("waiting step", execution.id.to_string()))?;

        self.store.record_step_approval(&execution.id, &waiting.step_id, approved_by)?;
        self.store.set_resume_token(&execution.id, None)?;
        self.store.set_execution_status(&execution.id, PipelineStatus::Running)?;

        let def = self
            .loader
            .get_pipeline(&execution.pipeline_name)
            .ok_or_else(|| {
                EngineError::NotFound("pipeline", execution.pipeline_name.clone())
            })?;
        let start = def
            .steps
            .iter()
            .position(|s| s.id == waiting.step_id)
            .unwrap_or(0);
        let execution = self.store.get_execution(&execution.id)?;
        self.execute_from(execution, def, start).await
    }

    pub fn cancel(&self, id: &PipelineExecutionId) -> Result<(), EngineError> {
        self.store.set_execution_status(id, PipelineStatus::Cancelled)?;
        Ok(())
    }

    /// Run steps from `start`, boxed for `invoke_pipeline` recursion.
    fn execute_from(
        &self,
        execution: PipelineExecution,
        def: PipelineDef,
        start: usize,
    ) -> Pin<Box<dyn Future<Output = Result<PipelineExecution, EngineError>> + Send + '_>> {
        Box::pin(async move {
            let execution_id = execution.id.clone();
            self.store.set_execution_status(&execution_id, PipelineStatus::Running)?;

            let inputs: HashMap<String, Value> = execution
                .inputs_json
                .as_deref()
                .and_then(|text| serde_json::from_str(text).ok())
                .unwrap_or_default();

            // Rebuild outputs of already-completed steps (resume path).
            let mut step_outputs: HashMap<String, Value> = HashMap::new();
            for step in self.store.list_steps(&execution_id)? {
                if step.status == StepExecutionStatus::Completed {
                    if let Some(output) = step.output_json.as_deref() {
                        if let Ok(value) = serde_json::from_str(output) {
                            step_outputs.insert(step.step_id.clone(), value);
                        }
                    }
                }
            }

            for (index, step) in def.steps.iter().enumerate() {
                if index < start {
                    continue;
                }
                let row = self.store.create_step(&execution_id, &step.id, None)?;
                if matches!(
                    row.status,
                    StepExecutionStatus::Completed | StepExecutionStatus::Skipped
                ) {
                    continue;
                }

                // Condition gate: false skips the step.
                if let Some(condition) = &step.condition {
                    let rendered = vars::substitute(condition, &inputs, &step_outputs);
                    if !self.conditions.evaluate(&rendered, &HashMap::new()) {
                        self.store.finish_step(
                            &execution_id,
                            &step.id,
                            StepExecutionStatus::Skipped,
                            None,
                            None,
                        )?;
                        continue;
                    }
                }

                // Approval gate, unless this step was already approved.
                if step.requires_approval() && row.approved_at.is_none() {
                    let token = gobby_core::new_uuid();
                    self.store.set_step_waiting_approval(&execution_id, &step.id, &token)?;
                    self.store.set_resume_token(&execution_id, Some(&token))?;
                    self.store
                        .set_execution_status(&execution_id, PipelineStatus::WaitingApproval)?;
                    let message = step.approval_message().map(str::to_string);
                    let payload = json!({
                        "event": "approval_pending",
                        "execution_id": execution_id.as_str(),
                        "pipeline": def.name,
                        "step_id": step.id,
                        "token": token.clone(),
                        "message": message.clone(),
                    });
                    self.webhooks
                        .deliver_all(&def.webhooks.on_approval_pending, &payload)
                        .await;
                    return Err(EngineError::ApprovalRequired {
                        execution_id,
                        step_id: step.id.clone(),
                        token,
                        message,
                    });
                }

                self.store.mark_step_running(&execution_id, &step.id)?;
                match self.run_step(&execution_id, step, &inputs, &step_outputs).await {
                    Ok(output) => {
                        let output_json = serde_json::to_string(&output)
                            .map_err(gobby_storage::StorageError::from)?;
                        self.store.finish_step(
                            &execution_id,
                            &step.id,
                            StepExecutionStatus::Completed,
                            Some(&output_json),
                            None,
                        )?;
                        step_outputs.insert(step.id.clone(), output);
                    }
                    Err(e) => {
                        self.store.finish_step(
                            &execution_id,
                            &step.id,
                            StepExecutionStatus::Failed,
                            None,
                            Some(&e.to_string()),
                        )?;
                        self.store
                            .set_execution_status(&execution_id, PipelineStatus::Failed)?;
                        let payload = json!({
                            "event": "failed",
                            "execution_id": execution_id.as_str(),
                            "pipeline": def.name,
                            "step_id": step.id,
                            "error": e.to_string(),
                        });
                        self.webhooks.deliver_all(&def.webhooks.on_failure, &payload).await;
                        return Err(e);
                    }
                }
            }

            // Output bindings: unresolvable references are dropped.
            let mut outputs = Map::new();
            for (name, reference) in &def.outputs {
                if let Some(value) = vars::resolve_ref(reference, &inputs, &step_outputs) {
                    outputs.insert(name.clone(), value);
                }
            }
            let outputs_json =
                serde_json::to_string(&outputs).map_err(gobby_storage::StorageError::from)?;
            self.store.set_outputs(&execution_id, &outputs_json)?;
            self.store.set_execution_status(&execution_id, PipelineStatus::Completed)?;

            let payload = json!({
                "event": "completed",
                "execution_id": execution_id.as_str(),
                "pipeline": def.name,
                "outputs": outputs,
            });
            self.webhooks.deliver_all(&def.webhooks.on_complete, &payload).await;

            Ok(self.store.get_execution(&execution_id)?)
        })
    }

    async fn run_step(
        &self,
        parent_id: &PipelineExecutionId,
        step: &PipelineStepDef,
        inputs: &HashMap<String, Value>,
        step_outputs: &HashMap<String, Value>,
    ) -> Result<Value, EngineError> {
        if let Some(command) = &step.exec {
            let rendered = vars::substitute(command, inputs, step_outputs);
            let output =
                run_with_timeout(&rendered, &self.workdir, &[], SHELL_COMMAND_TIMEOUT).await?;
            if !output.success() {
                return Err(EngineError::Validation(format!(
                    "exec step '{}' exited {}: {}",
                    step.id,
                    output.exit_code,
                    output.stderr.trim()
                )));
            }
            return Ok(json!({
                "exit_code": output.exit_code,
                "stdout": output.stdout,
                "stderr": output.stderr,
            }));
        }
        if let Some(prompt) = &step.prompt {
            let llm = self.llm.as_ref().ok_or(EngineError::LlmUnavailable)?;
            let rendered = vars::substitute(prompt, inputs, step_outputs);
            let request = LlmRequest {
                prompt: rendered,
                tools: step.tools.clone(),
                ..Default::default()
            };
            let result = llm
                .complete(request)
                .await
                .map_err(|e| EngineError::Validation(format!("prompt step '{}': {e}", step.id)))?;
            return Ok(result);
        }
        if let Some(child_name) = &step.invoke_pipeline {
            let child_def = self
                .loader
                .get_pipeline(child_name)
                .ok_or_else(|| EngineError::NotFound("pipeline", child_name.clone()))?;
            // Child inputs come from the step's input block, with
            // references substituted.
            let child_inputs: Map<String, Value> = match &step.input {
                Some(Value::Object(map)) => map
                    .iter()
                    .map(|(k, v)| {
                        let value = match v {
                            Value::String(s) => vars::resolve_ref(s, inputs, step_outputs)
                                .unwrap_or_else(|| {
                                    Value::String(vars::substitute(s, inputs, step_outputs))
                                }),
                            other => other.clone(),
                        };
                        (k.clone(), value)
                    })
                    .collect(),
                _ => Map::new(),
            };
            let inputs_json = serde_json::to_string(&child_inputs)
                .map_err(gobby_storage::StorageError::from)?;
            let child = self.store.create_execution(
                child_name,
                None,
                Some(&inputs_json),
                None,
                Some(parent_id),
            )?;
            let child = self.execute_from(child, child_def, 0).await?;
            let outputs: Value = child
                .outputs_json
                .as_deref()
                .and_then(|text| serde_json::from_str(text).ok())
                .unwrap_or_else(|| json!({}));
            return Ok(outputs);
        }
        Err(EngineError::Validation(format!(
            "step '{}' has no run directive",
            step.id
        )))
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
