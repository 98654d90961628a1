// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Schedule string parsing
//!
//! The CLI accepts either a 5-field cron expression (`"0 7 * * *"`) or an
//! interval duration like `300s` / `5m` / `2h`.

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ScheduleParseError {
    #[error("invalid schedule {0:?}: expected a 5-field cron expression or an interval like '300s'")]
    Invalid(String),
    #[error("interval must be positive")]
    ZeroInterval,
}

/// A parsed schedule argument.
#[derive(Debug, Clone, PartialEq)]
pub enum ScheduleSpec {
    /// 5-field cron expression, validated.
    Cron(String),
    /// Fixed interval in seconds.
    Interval(u64),
}

/// Parse a user-supplied schedule string.
pub fn parse_schedule(s: &str) -> Result<ScheduleSpec, ScheduleParseError> {
    let s = s.trim();
    if let Some(seconds) = parse_interval(s) {
        if seconds == 0 {
            return Err(ScheduleParseError::ZeroInterval);
        }
        return Ok(ScheduleSpec::Interval(seconds));
    }
    if is_valid_cron(s) {
        return Ok(ScheduleSpec::Cron(s.to_string()));
    }
    Err(ScheduleParseError::Invalid(s.to_string()))
}

/// Parse `300s` / `5m` / `2h` / `1d` style intervals.
fn parse_interval(s: &str) -> Option<u64> {
    let (digits, unit) = s.split_at(s.len().checked_sub(1)?);
    let n: u64 = digits.parse().ok()?;
    let factor = match unit {
        "s" => 1,
        "m" => 60,
        "h" => 3600,
        "d" => 86400,
        _ => return None,
    };
    n.checked_mul(factor)
}

/// Validate a 5-field cron expression.
pub fn is_valid_cron(expr: &str) -> bool {
    if expr.split_whitespace().count() != 5 {
        return false;
    }
    // The cron crate parses 6/7-field expressions with seconds first;
    // normalize by prepending a seconds field.
    let with_seconds = format!("0 {expr}");
    with_seconds.parse::<cron::Schedule>().is_ok()
}

#[cfg(test)]
#[path = "schedule_tests.rs"]
mod tests;
