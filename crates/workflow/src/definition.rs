// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow definitions
//!
//! A workflow is a declarative state machine loaded from YAML: triggers
//! fire actions on hook events, steps restrict tools and declare
//! transitions. Definitions are immutable once loaded; per-session
//! instance state lives in storage.

use gobby_core::HookEventType;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Tool whitelist for a step: everything, or an explicit set.
///
/// Accepts either the string `"all"` or a YAML list of tool names.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ToolList {
    All,
    Named(Vec<String>),
}

impl Default for ToolList {
    fn default() -> Self {
        Self::All
    }
}

impl ToolList {
    pub fn permits(&self, tool: &str) -> bool {
        match self {
            Self::All => true,
            Self::Named(tools) => tools.iter().any(|t| tool_name_matches(t, tool)),
        }
    }
}

impl<'de> Deserialize<'de> for ToolList {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Str(String),
            List(Vec<String>),
        }
        match Raw::deserialize(d)? {
            Raw::Str(s) if s == "all" => Ok(ToolList::All),
            Raw::Str(s) => Ok(ToolList::Named(vec![s])),
            Raw::List(v) => Ok(ToolList::Named(v)),
        }
    }
}

/// Source-agnostic tool name comparison.
///
/// Prefixed MCP names (`mcp__gobby__list_tools`) match both the full and
/// the bare name, in either direction.
pub fn tool_name_matches(pattern: &str, tool: &str) -> bool {
    if pattern == tool {
        return true;
    }
    let bare_pattern = strip_mcp_prefix(pattern);
    let bare_tool = strip_mcp_prefix(tool);
    bare_pattern == bare_tool
}

fn strip_mcp_prefix(name: &str) -> &str {
    if let Some(rest) = name.strip_prefix("mcp__") {
        match rest.split_once("__") {
            Some((_, bare)) => bare,
            None => rest,
        }
    } else {
        name
    }
}

/// A named rule evaluated for BEFORE_TOOL events within a step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRule {
    /// Condition expression; empty means never matches.
    #[serde(default)]
    pub when: String,
    /// Only `block` is acted upon today.
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// A conditional transition out of a step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepTransition {
    pub to: String,
    /// Condition expression; empty always fires.
    #[serde(default)]
    pub when: String,
}

/// One step of a workflow state machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowStep {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub allowed_tools: ToolList,
    #[serde(default)]
    pub blocked_tools: Vec<String>,
    #[serde(default)]
    pub rules: Vec<StepRule>,
    #[serde(default)]
    pub transitions: Vec<StepTransition>,
    /// Shown to the model when this step is entered via a transition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
    #[serde(default)]
    pub on_enter: Vec<TriggerAction>,
    #[serde(default)]
    pub on_exit: Vec<TriggerAction>,
}

/// A declarative action in a trigger or step hook.
///
/// `action` names the handler; all remaining keys are handler parameters
/// kept as raw JSON for the action executor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerAction {
    pub action: String,
    #[serde(flatten)]
    pub params: HashMap<String, Value>,
}

impl TriggerAction {
    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(Value::as_str)
    }

    pub fn param_bool(&self, key: &str) -> bool {
        self.params.get(key).and_then(Value::as_bool).unwrap_or(false)
    }
}

/// A workflow definition loaded from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_version")]
    pub version: String,
    /// Lower evaluates earlier.
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub variables: HashMap<String, Value>,
    /// Trigger key (`on_before_tool`, ...) to action list.
    #[serde(default)]
    pub triggers: HashMap<String, Vec<TriggerAction>>,
    #[serde(default)]
    pub steps: Vec<WorkflowStep>,
}

fn default_version() -> String {
    "1".to_string()
}

impl WorkflowDefinition {
    pub fn get_step(&self, name: &str) -> Option<&WorkflowStep> {
        self.steps.iter().find(|s| s.name == name)
    }

    pub fn first_step(&self) -> Option<&WorkflowStep> {
        self.steps.first()
    }

    /// Actions registered for a hook event type, empty when none.
    pub fn trigger_actions(&self, event_type: HookEventType) -> &[TriggerAction] {
        match trigger_key(event_type) {
            Some(key) => self.triggers.get(key).map(Vec::as_slice).unwrap_or(&[]),
            None => &[],
        }
    }
}

/// Map a hook event type to its trigger key in the definition.
pub fn trigger_key(event_type: HookEventType) -> Option<&'static str> {
    match event_type {
        HookEventType::SessionStart => Some("on_session_start"),
        HookEventType::SessionEnd => Some("on_session_end"),
        HookEventType::BeforeAgent => Some("on_before_agent"),
        HookEventType::AfterAgent => Some("on_after_agent"),
        HookEventType::BeforeTool => Some("on_before_tool"),
        HookEventType::AfterTool => Some("on_after_tool"),
        HookEventType::Stop => Some("on_stop"),
        HookEventType::PreCompact => Some("on_pre_compact"),
        HookEventType::Notification
        | HookEventType::SubagentStart
        | HookEventType::SubagentStop => None,
    }
}

/// Parse a workflow definition from YAML text.
pub fn parse_workflow(yaml: &str) -> Result<WorkflowDefinition, crate::WorkflowParseError> {
    let def: WorkflowDefinition = serde_yaml::from_str(yaml)?;
    if def.name.is_empty() {
        return Err(crate::WorkflowParseError::Invalid("workflow name is required".to_string()));
    }
    let mut seen = std::collections::HashSet::new();
    for step in &def.steps {
        if step.name.is_empty() {
            return Err(crate::WorkflowParseError::Invalid(format!(
                "workflow '{}' has a step with no name",
                def.name
            )));
        }
        if !seen.insert(step.name.as_str()) {
            return Err(crate::WorkflowParseError::Invalid(format!(
                "workflow '{}' has duplicate step '{}'",
                def.name, step.name
            )));
        }
    }
    for step in &def.steps {
        for transition in &step.transitions {
            if def.get_step(&transition.to).is_none() {
                return Err(crate::WorkflowParseError::Invalid(format!(
                    "workflow '{}' step '{}' transitions to unknown step '{}'",
                    def.name, step.name, transition.to
                )));
            }
        }
    }
    Ok(def)
}

#[cfg(test)]
#[path = "definition_tests.rs"]
mod tests;
