// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    pending = { PipelineStatus::Pending, "pending", false },
    running = { PipelineStatus::Running, "running", false },
    waiting = { PipelineStatus::WaitingApproval, "waiting_approval", false },
    completed = { PipelineStatus::Completed, "completed", true },
    failed = { PipelineStatus::Failed, "failed", true },
    cancelled = { PipelineStatus::Cancelled, "cancelled", true },
)]
fn pipeline_status_round_trip(status: PipelineStatus, s: &str, terminal: bool) {
    assert_eq!(status.as_str(), s);
    assert_eq!(PipelineStatus::parse(s), Some(status));
    assert_eq!(status.is_terminal(), terminal);
}

#[parameterized(
    skipped = { StepExecutionStatus::Skipped, "skipped" },
    waiting = { StepExecutionStatus::WaitingApproval, "waiting_approval" },
)]
fn step_status_round_trip(status: StepExecutionStatus, s: &str) {
    assert_eq!(status.as_str(), s);
    assert_eq!(StepExecutionStatus::parse(s), Some(status));
}

#[test]
fn execution_id_prefix() {
    assert!(PipelineExecutionId::new().as_str().starts_with("pe-"));
}
