// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! gobby-adapters: Per-CLI marshalling
//!
//! Hook adapters translate each CLI's native hook payloads to the unified
//! `HookEvent` model and render `HookResponse` back into the CLI's wire
//! shape. Terminal adapters spawn and drive detached terminal sessions
//! for the agent runner. Adapters marshal only; they never touch storage
//! or workflow state.

pub mod hook;
pub mod session;
pub mod subprocess;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("unknown adapter: {0}")]
    UnknownAdapter(String),
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
}

pub use hook::{AdapterRegistry, HookAdapter, HookHandler};
pub use session::{SessionAdapter, SessionError, TmuxAdapter};
#[cfg(any(test, feature = "test-support"))]
pub use session::FakeSessionAdapter;
pub use subprocess::{run_git, run_with_timeout, CommandOutput, SubprocessError};
