// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pipeline variable substitution
//!
//! `$inputs.X` resolves from the execution's inputs; `$step_id.output`
//! and `$step_id.output.field` resolve from completed step outputs.
//! Undefined references are left as the literal placeholder text so a
//! typo is visible in the rendered command instead of vanishing.

use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Regex for `$inputs.name` / `$step.output` / `$step.output.field` refs.
// Allow expect here as the regex is compile-time verified to be valid
#[allow(clippy::expect_used)]
static REF_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$([a-zA-Z_][a-zA-Z0-9_-]*)((?:\.[a-zA-Z_][a-zA-Z0-9_-]*)+)")
        .expect("constant regex pattern is valid")
});

/// Substitute `$…` references in a template string.
///
/// `inputs` holds the pipeline's input values; `step_outputs` maps step
/// id → that step's structured output.
pub fn substitute(
    template: &str,
    inputs: &HashMap<String, Value>,
    step_outputs: &HashMap<String, Value>,
) -> String {
    REF_PATTERN
        .replace_all(template, |caps: &regex::Captures| {
            let root = &caps[1];
            let path: Vec<&str> = caps[2].split('.').skip(1).collect();
            match resolve(root, &path, inputs, step_outputs) {
                Some(value) => value_to_string(&value),
                None => caps[0].to_string(),
            }
        })
        .to_string()
}

/// Resolve a single `$…` reference to its value, if defined.
pub fn resolve_ref(
    reference: &str,
    inputs: &HashMap<String, Value>,
    step_outputs: &HashMap<String, Value>,
) -> Option<Value> {
    let caps = REF_PATTERN.captures(reference)?;
    // The reference must be the whole string, not an embedded match.
    if caps.get(0).map(|m| m.as_str()) != Some(reference.trim()) {
        return None;
    }
    let root = &caps[1];
    let path: Vec<&str> = caps[2].split('.').skip(1).collect();
    resolve(root, &path, inputs, step_outputs)
}

fn resolve(
    root: &str,
    path: &[&str],
    inputs: &HashMap<String, Value>,
    step_outputs: &HashMap<String, Value>,
) -> Option<Value> {
    if root == "inputs" {
        let (first, rest) = path.split_first()?;
        let mut current = inputs.get(*first)?;
        for part in rest {
            current = current.get(part)?;
        }
        return Some(current.clone());
    }
    // `$step_id.output[.field...]`
    let (first, rest) = path.split_first()?;
    if *first != "output" {
        return None;
    }
    let mut current = step_outputs.get(root)?;
    for part in rest {
        current = current.get(part)?;
    }
    Some(current.clone())
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
#[path = "vars_tests.rs"]
mod tests;
