// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    cron_expr = { "0 7 * * *" },
    interval = { "300s" },
    minutes = { "5m" },
)]
fn valid_schedules_pass_preflight(schedule: &str) {
    assert!(gobby_workflow::parse_schedule(schedule).is_ok());
}

#[parameterized(
    garbage = { "whenever" },
    bare_number = { "300" },
    four_fields = { "0 7 * *" },
)]
fn invalid_schedules_fail_preflight(schedule: &str) {
    assert!(gobby_workflow::parse_schedule(schedule).is_err());
}

#[test]
fn schedule_text_prefers_cron_expr() {
    let job = serde_json::json!({"cron_expr": "0 7 * * *", "interval_seconds": null});
    assert_eq!(schedule_text(&job), "0 7 * * *");
    let job = serde_json::json!({"interval_seconds": 300});
    assert_eq!(schedule_text(&job), "300s");
    let job = serde_json::json!({"run_at": "2026-03-01T00:00:00Z"});
    assert_eq!(schedule_text(&job), "2026-03-01T00:00:00Z");
}
