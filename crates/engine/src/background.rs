// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Background task tracker
//!
//! Fire-and-forget actions are tracked in a process-wide set so shutdown
//! can await them and nothing is silently dropped mid-flight. Results
//! are discarded; errors are logged from the completion path.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;

#[derive(Clone, Default)]
pub struct BackgroundTasks {
    inner: Arc<Mutex<HashMap<u64, JoinHandle<()>>>>,
    next_id: Arc<Mutex<u64>>,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a future whose result is discarded. The task removes itself
    /// from the set when done and logs its error, never propagating it
    /// to the caller.
    pub fn spawn<F>(&self, label: &'static str, future: F)
    where
        F: Future<Output = Result<(), String>> + Send + 'static,
    {
        let id = {
            let mut next = self.next_id.lock();
            *next += 1;
            *next
        };
        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move {
            if let Err(e) = future.await {
                tracing::warn!(label, error = %e, "background action failed");
            }
            inner.lock().remove(&id);
        });
        self.inner.lock().insert(id, handle);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Abort everything still in flight (shutdown path).
    pub fn abort_all(&self) {
        for (_, handle) in self.inner.lock().drain() {
            handle.abort();
        }
    }
}

#[cfg(test)]
#[path = "background_tests.rs"]
mod tests;
