// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    in_process = { AgentMode::InProcess, "in_process" },
    terminal = { AgentMode::Terminal, "terminal" },
    embedded = { AgentMode::Embedded, "embedded" },
    headless = { AgentMode::Headless, "headless" },
)]
fn mode_round_trip(mode: AgentMode, s: &str) {
    assert_eq!(mode.as_str(), s);
    assert_eq!(AgentMode::parse(s), Some(mode));
}

#[parameterized(
    worktree = { IsolationMode::Worktree, "worktree" },
    clone = { IsolationMode::Clone, "clone" },
)]
fn isolation_round_trip(mode: IsolationMode, s: &str) {
    assert_eq!(mode.as_str(), s);
    assert_eq!(IsolationMode::parse(s), Some(mode));
}

#[test]
fn unknown_mode_rejected() {
    assert_eq!(AgentMode::parse("docker"), None);
    assert_eq!(IsolationMode::parse("vm"), None);
}

#[test]
fn id_prefixes() {
    assert!(AgentRunId::new().as_str().starts_with("ar-"));
    assert!(WorktreeId::new().as_str().starts_with("wt-"));
}
