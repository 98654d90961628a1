// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;
use yare::parameterized;

fn ctx() -> HashMap<String, Value> {
    let mut map = HashMap::new();
    map.insert("count".to_string(), json!(3));
    map.insert("name".to_string(), json!("build"));
    map.insert("flag".to_string(), json!(true));
    map.insert("items".to_string(), json!(["a", "b"]));
    map.insert(
        "variables".to_string(),
        json!({"plan_ready": true, "spawned_agents": ["a1"], "retries": 0}),
    );
    map.insert("tool_name".to_string(), json!("Bash"));
    map
}

#[parameterized(
    eq_true = { "count == 3", true },
    eq_false = { "count == 4", false },
    ne = { "name != 'test'", true },
    lt = { "count < 5", true },
    ge = { "count >= 3", true },
    string_eq = { "tool_name == 'Bash'", true },
    bool_name = { "flag", true },
    and_true = { "flag and count == 3", true },
    and_false = { "flag and count == 9", false },
    or_short = { "count == 9 or flag", true },
    not_op = { "not flag", false },
    membership = { "'a' in items", true },
    not_membership = { "'z' not in items", true },
    substring = { "'uil' in name", true },
    attr_access = { "variables.plan_ready", true },
    attr_compare = { "variables.retries == 0", true },
    index_access = { "items[0] == 'a'", true },
    negative_index = { "items[-1] == 'b'", true },
    arithmetic = { "count + 1 == 4", true },
    multiply = { "count * 2 > 5", true },
    modulo = { "count % 2 == 1", true },
    len_call = { "len(items) == 2", true },
    len_attr = { "len(variables.spawned_agents) < 3", true },
    list_literal = { "tool_name in ['Bash', 'Write']", true },
    string_concat = { "name + '!' == 'build!'", true },
    paren_grouping = { "(count + 1) * 2 == 8", true },
)]
fn evaluates(expr: &str, expected: bool) {
    let evaluator = ConditionEvaluator::new();
    assert_eq!(evaluator.evaluate(expr, &ctx()), expected, "expr: {expr}");
}

#[parameterized(
    unknown_name = { "nonexistent == 1" },
    unknown_function = { "shutil('x')" },
    unknown_attr = { "variables.nope" },
    division_by_zero = { "count / 0 == 1" },
    parse_error = { "count ==" },
    bad_char = { "count @ 3" },
    assignment = { "count = 3" },
    call_on_attr = { "variables.plan_ready()" },
)]
fn errors_evaluate_to_false(expr: &str) {
    let evaluator = ConditionEvaluator::new();
    assert!(!evaluator.evaluate(expr, &ctx()), "expr: {expr}");
}

#[test]
fn empty_expression_is_false() {
    let evaluator = ConditionEvaluator::new();
    assert!(!evaluator.evaluate("", &ctx()));
    assert!(!evaluator.evaluate("   ", &ctx()));
}

#[test]
fn registered_functions_are_callable() {
    let mut evaluator = ConditionEvaluator::new();
    evaluator.register("deployment_frozen", |_args| Ok(Value::Bool(true)));
    assert!(evaluator.evaluate("deployment_frozen()", &ctx()));
}

#[test]
fn short_circuit_skips_erroring_right_side() {
    let evaluator = ConditionEvaluator::new();
    // Right side would error (unknown name) but is never evaluated.
    assert!(!evaluator.evaluate("false and nonexistent", &ctx()));
    assert!(evaluator.evaluate("true or nonexistent", &ctx()));
}

#[test]
fn numeric_equality_crosses_int_float() {
    let evaluator = ConditionEvaluator::new();
    let mut context = ctx();
    context.insert("ratio".to_string(), json!(2.0));
    assert!(evaluator.evaluate("ratio == 2", &context));
}

#[test]
fn evaluate_value_surfaces_errors() {
    let evaluator = ConditionEvaluator::new();
    let err = evaluator.evaluate_value("missing", &ctx()).unwrap_err();
    assert_eq!(err, EvalError::UnknownName("missing".to_string()));
}

#[test]
fn truthiness_rules() {
    assert!(!truthy(&Value::Null));
    assert!(!truthy(&json!(0)));
    assert!(truthy(&json!(0.5)));
    assert!(!truthy(&json!("")));
    assert!(truthy(&json!("x")));
    assert!(!truthy(&json!([])));
    assert!(truthy(&json!({"k": 1})));
}
