// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Identifier scheme
//!
//! Durable entities (projects, sessions, tasks, memories, prompts, step
//! executions) are keyed by plain UUIDv4 strings — they live in SQLite
//! TEXT columns and JSON payloads, so a string is the honest
//! representation. Records created at runtime by the daemon itself
//! (pipeline executions, cron jobs and runs, agent runs, worktrees) use
//! [`TaggedId`]: a short family tag, a dash, and the undashed hex of a
//! v4 UUID, e.g. `pe-1f87c09a2e4d4b169a1c03d85f6e2a40`. The tag makes an
//! id self-describing in logs and API payloads, the marker type keeps
//! id families from crossing assignment boundaries at compile time, and
//! every id kind draws from the same UUID random source.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Generate a fresh UUIDv4 string for entities keyed by UUID.
pub fn new_uuid() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Returns a string slice truncated to at most `n` characters.
pub fn short(s: &str, n: usize) -> &str {
    if s.len() <= n {
        s
    } else {
        &s[..n]
    }
}

/// Marker trait naming a tagged id family.
///
/// Tags are short lowercase labels without dashes; the dash is the
/// separator between tag and random suffix.
pub trait IdTag {
    const TAG: &'static str;
}

/// A typed id of the form `"{tag}-{uuid hex}"`.
///
/// `from_string` accepts any stored value so database round-trips never
/// fail; only [`TaggedId::new`] guarantees the canonical shape.
pub struct TaggedId<K> {
    value: String,
    _kind: PhantomData<fn() -> K>,
}

impl<K: IdTag> TaggedId<K> {
    /// Generate a fresh id for this family.
    pub fn new() -> Self {
        Self::from_string(format!("{}-{}", K::TAG, uuid::Uuid::new_v4().simple()))
    }

    /// Wrap an existing stored value.
    pub fn from_string(value: impl Into<String>) -> Self {
        Self { value: value.into(), _kind: PhantomData }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// The random portion, without the family tag.
    pub fn suffix(&self) -> &str {
        match self.value.split_once('-') {
            Some((_, rest)) => rest,
            None => &self.value,
        }
    }

    /// Truncated suffix, for display and derived names (tmux sessions,
    /// branch names, log files).
    pub fn short(&self, n: usize) -> &str {
        short(self.suffix(), n)
    }

    /// Whether `value` carries this family's tag.
    pub fn is_tagged(value: &str) -> bool {
        match value.split_once('-') {
            Some((tag, _)) => tag == K::TAG,
            None => false,
        }
    }
}

impl<K: IdTag> Default for TaggedId<K> {
    fn default() -> Self {
        Self::new()
    }
}

// Hand-written impls: derives would put unnecessary bounds on the
// marker type, which is never instantiated.

impl<K> Clone for TaggedId<K> {
    fn clone(&self) -> Self {
        Self { value: self.value.clone(), _kind: PhantomData }
    }
}

impl<K> PartialEq for TaggedId<K> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<K> Eq for TaggedId<K> {}

impl<K> Hash for TaggedId<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl<K> fmt::Debug for TaggedId<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.value)
    }
}

impl<K> fmt::Display for TaggedId<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl<K> Serialize for TaggedId<K> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.value)
    }
}

impl<'de, K> Deserialize<'de> for TaggedId<K> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(Self { value, _kind: PhantomData })
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
