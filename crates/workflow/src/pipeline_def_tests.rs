// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

const SAMPLE: &str = r#"
name: build-deploy
type: pipeline
inputs: [branch]
outputs:
  artifact: $build.output.stdout
steps:
  - id: build
    exec: "make build"
  - id: deploy
    exec: "make deploy"
    condition: "$build.output.exit_code == 0"
    approval:
      required: true
      message: "Deploy to prod?"
webhooks:
  on_complete:
    - url: "https://hooks.example/done"
      retry_count: 2
"#;

#[test]
fn parses_sequence_form() {
    let def = parse_pipeline(SAMPLE).unwrap();
    assert_eq!(def.name, "build-deploy");
    assert_eq!(def.inputs, vec!["branch"]);
    assert_eq!(def.steps.len(), 2);
    assert!(def.get_step("deploy").unwrap().requires_approval());
    assert_eq!(
        def.get_step("deploy").unwrap().approval_message(),
        Some("Deploy to prod?")
    );
    assert_eq!(def.outputs.get("artifact").map(String::as_str), Some("$build.output.stdout"));
    assert_eq!(def.webhooks.on_complete.len(), 1);
    assert_eq!(def.webhooks.on_complete[0].retry_count, 2);
    assert_eq!(def.webhooks.on_complete[0].method, "POST");
}

#[test]
fn parses_mapping_form_preserving_order() {
    let yaml = r#"
name: mapped
steps:
  first:
    exec: "true"
  second:
    prompt: "summarize"
    tools: [Read]
  third:
    invoke_pipeline: "other"
"#;
    let def = parse_pipeline(yaml).unwrap();
    let ids: Vec<&str> = def.steps.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["first", "second", "third"]);
    assert_eq!(def.steps[1].tools, vec!["Read"]);
}

#[test]
fn rejects_step_with_no_directive() {
    let yaml = r#"
name: bad
steps:
  - id: a
"#;
    assert!(parse_pipeline(yaml).is_err());
}

#[test]
fn rejects_step_with_two_directives() {
    let yaml = r#"
name: bad
steps:
  - id: a
    exec: "true"
    prompt: "also"
"#;
    let err = parse_pipeline(yaml).unwrap_err();
    assert!(err.to_string().contains("exactly one"));
}

#[test]
fn rejects_duplicate_step_ids() {
    let yaml = r#"
name: bad
steps:
  - id: a
    exec: "true"
  - id: a
    exec: "false"
"#;
    assert!(parse_pipeline(yaml).is_err());
}

#[test]
fn rejects_missing_name() {
    assert!(parse_pipeline("steps: []").is_err());
}

#[test]
fn webhook_defaults() {
    let def: WebhookDef = serde_yaml::from_str("url: http://x").unwrap();
    assert_eq!(def.method, "POST");
    assert_eq!(def.timeout, 10);
    assert_eq!(def.retry_count, 0);
    assert_eq!(def.retry_delay, 1);
    assert!(!def.can_block);
}
