// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Memory entity
//!
//! The row holds content and provenance; the vector embedding lives in an
//! external store keyed by the memory id.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Memory {
    /// UUIDv4 row id; also the external embedding key.
    pub id: String,
    pub project_id: String,
    pub content: String,
    /// Classification: fact, decision, preference, ...
    pub memory_type: String,
    /// Where the memory came from: manual, extraction, import.
    pub source_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_session_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: String,
}
