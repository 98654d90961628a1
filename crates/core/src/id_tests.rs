// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::agent::AgentRunId;
use crate::cron::{CronJobId, CronRunId};
use crate::pipeline::PipelineExecutionId;

#[test]
fn generated_ids_carry_their_tag() {
    assert!(PipelineExecutionId::new().as_str().starts_with("pe-"));
    assert!(CronJobId::new().as_str().starts_with("cj-"));
    assert!(CronRunId::new().as_str().starts_with("cr-"));
    assert!(AgentRunId::new().as_str().starts_with("ar-"));
}

#[test]
fn suffix_is_undashed_uuid_hex() {
    let id = PipelineExecutionId::new();
    let suffix = id.suffix();
    assert_eq!(suffix.len(), 32);
    assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn generated_ids_are_unique() {
    let a = CronJobId::new();
    let b = CronJobId::new();
    assert_ne!(a, b);
}

#[test]
fn from_string_round_trips_stored_values() {
    let id = PipelineExecutionId::from_string("pe-abc123");
    assert_eq!(id.as_str(), "pe-abc123");
    assert_eq!(id.suffix(), "abc123");
}

#[test]
fn suffix_of_untagged_value_is_the_whole_string() {
    let id = PipelineExecutionId::from_string("legacy");
    assert_eq!(id.suffix(), "legacy");
}

#[test]
fn short_truncates_the_suffix() {
    let id = PipelineExecutionId::from_string("pe-abcdefgh");
    assert_eq!(id.short(4), "abcd");
    assert_eq!(id.short(100), "abcdefgh");
}

#[test]
fn is_tagged_checks_the_family_tag() {
    assert!(CronJobId::is_tagged("cj-123"));
    assert!(!CronJobId::is_tagged("cr-123"));
    assert!(!CronJobId::is_tagged("nightly"));
    assert!(!CronJobId::is_tagged(""));
}

#[test]
fn ids_work_as_hash_map_keys() {
    use std::collections::HashMap;
    let id = AgentRunId::new();
    let mut map: HashMap<AgentRunId, u32> = HashMap::new();
    map.insert(id.clone(), 1);
    assert_eq!(map.get(&id), Some(&1));
}

#[test]
fn serde_round_trips_as_plain_strings() {
    let id = PipelineExecutionId::from_string("pe-serde");
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"pe-serde\"");
    let back: PipelineExecutionId = serde_json::from_str(&json).unwrap();
    assert_eq!(back, id);
}

#[test]
fn short_fn_truncates_and_passes_through() {
    assert_eq!(short("hello", 3), "hel");
    assert_eq!(short("hi", 10), "hi");
}

#[test]
fn new_uuid_is_v4_shaped() {
    let id = new_uuid();
    assert_eq!(id.len(), 36);
    assert_eq!(id.chars().filter(|c| *c == '-').count(), 4);
}
