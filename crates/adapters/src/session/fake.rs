// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake session adapter for tests

use super::{SessionAdapter, SessionError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Records spawn/send/kill calls instead of touching a terminal.
#[derive(Clone, Default)]
pub struct FakeSessionAdapter {
    inner: Arc<Mutex<FakeState>>,
}

#[derive(Default)]
struct FakeState {
    sessions: HashMap<String, Vec<String>>,
    fail_spawn: bool,
}

impl FakeSessionAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next spawn calls fail.
    pub fn fail_spawns(&self) {
        self.inner.lock().fail_spawn = true;
    }

    pub fn sent_inputs(&self, id: &str) -> Vec<String> {
        self.inner.lock().sessions.get(id).cloned().unwrap_or_default()
    }

    pub fn session_count(&self) -> usize {
        self.inner.lock().sessions.len()
    }
}

#[async_trait]
impl SessionAdapter for FakeSessionAdapter {
    async fn spawn(
        &self,
        name: &str,
        _cwd: &Path,
        _cmd: &str,
        _env: &[(String, String)],
    ) -> Result<String, SessionError> {
        let mut state = self.inner.lock();
        if state.fail_spawn {
            return Err(SessionError::SpawnFailed("forced failure".to_string()));
        }
        let id = format!("gobby-{name}");
        state.sessions.insert(id.clone(), Vec::new());
        Ok(id)
    }

    async fn send(&self, id: &str, input: &str) -> Result<(), SessionError> {
        let mut state = self.inner.lock();
        match state.sessions.get_mut(id) {
            Some(inputs) => {
                inputs.push(input.to_string());
                Ok(())
            }
            None => Err(SessionError::NotFound(id.to_string())),
        }
    }

    async fn is_running(&self, id: &str) -> bool {
        self.inner.lock().sessions.contains_key(id)
    }

    async fn kill(&self, id: &str) -> Result<(), SessionError> {
        match self.inner.lock().sessions.remove(id) {
            Some(_) => Ok(()),
            None => Err(SessionError::NotFound(id.to_string())),
        }
    }

    async fn list(&self) -> Result<Vec<String>, SessionError> {
        Ok(self.inner.lock().sessions.keys().cloned().collect())
    }
}
