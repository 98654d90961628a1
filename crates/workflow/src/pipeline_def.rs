// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pipeline definitions
//!
//! Pipelines are DAGs of steps declared in YAML. Each step runs exactly
//! one of `exec` (shell command), `prompt` (LLM call), or
//! `invoke_pipeline` (child pipeline). Steps may be gated by a
//! `condition` and an approval requirement. `$inputs.X` and
//! `$step_id.output[.field]` placeholders are substituted at run time.

use indexmap::IndexMap;
use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Approval gate configuration for a step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApprovalDef {
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// A single webhook endpoint with its retry policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookDef {
    pub url: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default)]
    pub retry_count: u32,
    /// Constant delay between retries, seconds.
    #[serde(default = "default_retry_delay")]
    pub retry_delay: u64,
    /// When true, a `{"decision": "block"|"deny"}` body short-circuits
    /// the call site.
    #[serde(default)]
    pub can_block: bool,
}

fn default_method() -> String {
    "POST".to_string()
}

fn default_timeout() -> u64 {
    10
}

fn default_retry_delay() -> u64 {
    1
}

/// Webhook endpoints per pipeline lifecycle event.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineWebhooks {
    #[serde(default)]
    pub on_approval_pending: Vec<WebhookDef>,
    #[serde(default)]
    pub on_complete: Vec<WebhookDef>,
    #[serde(default)]
    pub on_failure: Vec<WebhookDef>,
}

/// A step within a pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineStepDef {
    /// Step id (injected from map key in the mapping format).
    #[serde(default)]
    pub id: String,
    /// Shell command to run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exec: Option<String>,
    /// LLM prompt to run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    /// Child pipeline to invoke by name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoke_pipeline: Option<String>,
    /// Tool whitelist for prompt steps.
    #[serde(default)]
    pub tools: Vec<String>,
    /// Extra structured input passed to the step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<serde_json::Value>,
    /// Skip the step when this expression is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval: Option<ApprovalDef>,
}

impl PipelineStepDef {
    /// True when the step needs an approval before running.
    pub fn requires_approval(&self) -> bool {
        self.approval.as_ref().map(|a| a.required).unwrap_or(false)
    }

    pub fn approval_message(&self) -> Option<&str> {
        self.approval.as_ref().and_then(|a| a.message.as_deref())
    }
}

/// A pipeline definition from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDef {
    #[serde(default)]
    pub name: String,
    /// Always "pipeline"; present so workflow and pipeline files can share
    /// a directory.
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default = "default_version")]
    pub version: String,
    /// Required input names.
    #[serde(default)]
    pub inputs: Vec<String>,
    /// Output bindings: name → `$step.output[.field]` reference.
    #[serde(default)]
    pub outputs: IndexMap<String, String>,
    #[serde(default, deserialize_with = "deserialize_steps")]
    pub steps: Vec<PipelineStepDef>,
    #[serde(default)]
    pub webhooks: PipelineWebhooks,
}

fn default_version() -> String {
    "1".to_string()
}

/// Deserialize steps from either a sequence or a map of labeled blocks.
///
/// A YAML sequence keeps explicit `id` fields; a mapping injects the map
/// key as the step id (IndexMap preserves declaration order).
fn deserialize_steps<'de, D>(deserializer: D) -> Result<Vec<PipelineStepDef>, D::Error>
where
    D: Deserializer<'de>,
{
    struct StepsVisitor;

    impl<'de> Visitor<'de> for StepsVisitor {
        type Value = Vec<PipelineStepDef>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a sequence of steps or a map of labeled step blocks")
        }

        fn visit_seq<S>(self, seq: S) -> Result<Vec<PipelineStepDef>, S::Error>
        where
            S: SeqAccess<'de>,
        {
            Vec::deserialize(de::value::SeqAccessDeserializer::new(seq))
        }

        fn visit_map<M>(self, map: M) -> Result<Vec<PipelineStepDef>, M::Error>
        where
            M: MapAccess<'de>,
        {
            let index_map: IndexMap<String, PipelineStepDef> =
                IndexMap::deserialize(de::value::MapAccessDeserializer::new(map))?;
            Ok(index_map
                .into_iter()
                .map(|(key, mut step)| {
                    if step.id.is_empty() {
                        step.id = key;
                    }
                    step
                })
                .collect())
        }
    }

    deserializer.deserialize_any(StepsVisitor)
}

impl PipelineDef {
    pub fn get_step(&self, id: &str) -> Option<&PipelineStepDef> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// Structural validation: unique step ids, exactly one run directive
    /// per step.
    pub fn validate(&self) -> Result<(), crate::WorkflowParseError> {
        if self.name.is_empty() {
            return Err(crate::WorkflowParseError::Invalid("pipeline name is required".to_string()));
        }
        let mut seen = std::collections::HashSet::new();
        for step in &self.steps {
            if step.id.is_empty() {
                return Err(crate::WorkflowParseError::Invalid(format!(
                    "pipeline '{}' has a step with no id",
                    self.name
                )));
            }
            if !seen.insert(step.id.as_str()) {
                return Err(crate::WorkflowParseError::Invalid(format!(
                    "pipeline '{}' has duplicate step id '{}'",
                    self.name, step.id
                )));
            }
            let directives = [
                step.exec.is_some(),
                step.prompt.is_some(),
                step.invoke_pipeline.is_some(),
            ];
            if directives.iter().filter(|b| **b).count() != 1 {
                return Err(crate::WorkflowParseError::Invalid(format!(
                    "pipeline '{}' step '{}' must set exactly one of exec, prompt, invoke_pipeline",
                    self.name, step.id
                )));
            }
        }
        Ok(())
    }
}

/// Parse and validate a pipeline definition from YAML text.
pub fn parse_pipeline(yaml: &str) -> Result<PipelineDef, crate::WorkflowParseError> {
    let def: PipelineDef = serde_yaml::from_str(yaml)?;
    def.validate()?;
    Ok(def)
}

#[cfg(test)]
#[path = "pipeline_def_tests.rs"]
mod tests;
