// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[test]
fn utc_now_iso_parses_back() {
    let s = utc_now_iso();
    assert!(parse_iso(&s).is_some());
    assert!(s.ends_with('Z'));
}

#[test]
fn parse_iso_rejects_garbage() {
    assert!(parse_iso("not-a-time").is_none());
    assert!(parse_iso("").is_none());
}

#[test]
fn iso_strings_sort_chronologically() {
    let early = to_iso(chrono::Utc::now());
    std::thread::sleep(std::time::Duration::from_millis(2));
    let late = to_iso(chrono::Utc::now());
    assert!(early < late);
}

#[parameterized(
    seconds = { 5, "5s" },
    minutes = { 125, "2m5s" },
    hours = { 3660, "1h1m" },
)]
fn format_elapsed_cases(seconds: u64, expected: &str) {
    assert_eq!(format_elapsed(seconds), expected);
}
