// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Template variable interpolation
//!
//! Templates use `{{ name }}` placeholders with optional dotted paths
//! (`{{ session.title }}`) and a `default` filter
//! (`{{ title | default("untitled") }}`). Rendering is best effort:
//! unknown variables resolve through their filter default or are left
//! as-is, and a malformed template renders to itself.

use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Regex for `{{ name }}` or `{{ name | default("fallback") }}`.
// Allow expect here as the regex is compile-time verified to be valid
#[allow(clippy::expect_used)]
static VAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"\{\{\s*([a-zA-Z_][a-zA-Z0-9_]*(?:\.[a-zA-Z_][a-zA-Z0-9_]*)*)\s*(?:\|\s*default\(\s*"([^"]*)"\s*\)\s*)?\}\}"#,
    )
    .expect("constant regex pattern is valid")
});

/// Stateless template renderer over a JSON name-resolution context.
#[derive(Debug, Clone, Default)]
pub struct TemplateEngine;

impl TemplateEngine {
    pub fn new() -> Self {
        Self
    }

    /// Render `template` against `context`.
    ///
    /// Placeholders that resolve to nothing and carry no `default` filter
    /// are left verbatim so the output never loses information.
    pub fn render(&self, template: &str, context: &HashMap<String, Value>) -> String {
        VAR_PATTERN
            .replace_all(template, |caps: &regex::Captures| {
                let path = &caps[1];
                match lookup_path(context, path) {
                    Some(value) => value_to_string(value),
                    None => match caps.get(2) {
                        Some(default) => default.as_str().to_string(),
                        None => caps[0].to_string(),
                    },
                }
            })
            .to_string()
    }

    /// Render every string leaf of a JSON value in place.
    pub fn render_value(&self, value: &Value, context: &HashMap<String, Value>) -> Value {
        match value {
            Value::String(s) => Value::String(self.render(s, context)),
            Value::Array(items) => {
                Value::Array(items.iter().map(|v| self.render_value(v, context)).collect())
            }
            Value::Object(map) => Value::Object(
                map.iter().map(|(k, v)| (k.clone(), self.render_value(v, context))).collect(),
            ),
            other => other.clone(),
        }
    }
}

/// Resolve a dotted path through nested JSON objects.
fn lookup_path<'a>(context: &'a HashMap<String, Value>, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let first = parts.next()?;
    let mut current = context.get(first)?;
    for part in parts {
        current = current.get(part)?;
    }
    if current.is_null() {
        None
    } else {
        Some(current)
    }
}

/// Render a JSON value as template output text.
///
/// Strings render bare (no quotes); everything else uses JSON syntax.
fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
#[path = "template_tests.rs"]
mod tests;
