// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! UTC ISO-8601 timestamp helpers
//!
//! All durable timestamps are stored as UTC ISO-8601 strings so rows sort
//! lexicographically by time.

use chrono::{DateTime, SecondsFormat, Utc};

/// Current time as a UTC ISO-8601 string with microsecond precision.
pub fn utc_now_iso() -> String {
    to_iso(Utc::now())
}

/// Format a datetime as a UTC ISO-8601 string.
pub fn to_iso(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored ISO-8601 timestamp back into a UTC datetime.
///
/// Returns `None` for malformed input rather than erroring; callers treat
/// unparseable timestamps as absent.
pub fn parse_iso(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.with_timezone(&Utc))
}

/// Format an elapsed duration in seconds as a compact human string.
pub fn format_elapsed(seconds: u64) -> String {
    if seconds < 60 {
        format!("{seconds}s")
    } else if seconds < 3600 {
        format!("{}m{}s", seconds / 60, seconds % 60)
    } else {
        format!("{}h{}m", seconds / 3600, (seconds % 3600) / 60)
    }
}

#[cfg(test)]
#[path = "time_fmt_tests.rs"]
mod tests;
