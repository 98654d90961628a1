// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::TaskBuilder;
use yare::parameterized;

#[parameterized(
    open = { TaskStatus::Open, "open" },
    in_progress = { TaskStatus::InProgress, "in_progress" },
    review = { TaskStatus::Review, "review" },
    closed = { TaskStatus::Closed, "closed" },
)]
fn status_round_trip(status: TaskStatus, s: &str) {
    assert_eq!(status.as_str(), s);
    assert_eq!(TaskStatus::parse(s), Some(status));
}

#[test]
fn only_closed_is_terminal() {
    assert!(TaskStatus::Closed.is_terminal());
    assert!(!TaskStatus::Open.is_terminal());
    assert!(!TaskStatus::Review.is_terminal());
}

#[test]
fn short_ref_uses_seq_num() {
    let task = TaskBuilder::new("Fix it").seq_num(42).build();
    assert_eq!(task.short_ref(), "#42");
}

#[parameterized(
    blocks = { DepType::Blocks, "blocks" },
    relates = { DepType::RelatesTo, "relates_to" },
)]
fn dep_type_round_trip(dep: DepType, s: &str) {
    assert_eq!(dep.as_str(), s);
    assert_eq!(DepType::parse(s), Some(dep));
}

#[test]
fn dep_type_rejects_unknown() {
    assert_eq!(DepType::parse("duplicates"), None);
}
