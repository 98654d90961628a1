// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! gobby-workflow: Declarative workflow and pipeline definitions
//!
//! Parsing, validation, and evaluation primitives for the YAML-declared
//! state machines the engine runs: workflow definitions, pipeline
//! definitions, templates, conditions, and schedules.

pub mod condition;
pub mod definition;
pub mod loader;
pub mod pipeline_def;
pub mod schedule;
pub mod template;
pub mod vars;

use thiserror::Error;

/// Definition parse/validation failure.
#[derive(Debug, Error)]
pub enum WorkflowParseError {
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("{0}")]
    Invalid(String),
}

pub use condition::{ConditionEvaluator, EvalError};
pub use definition::{
    parse_workflow, tool_name_matches, trigger_key, StepRule, StepTransition, ToolList,
    TriggerAction, WorkflowDefinition, WorkflowStep,
};
pub use loader::{DefinitionLoader, LoaderDirs};
pub use pipeline_def::{
    parse_pipeline, ApprovalDef, PipelineDef, PipelineStepDef, PipelineWebhooks, WebhookDef,
};
pub use schedule::{is_valid_cron, parse_schedule, ScheduleParseError, ScheduleSpec};
pub use template::TemplateEngine;
