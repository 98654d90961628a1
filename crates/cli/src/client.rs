// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP client for the daemon

use anyhow::{anyhow, Result};
use serde_json::Value;

pub struct DaemonClient {
    base: String,
    http: reqwest::Client,
}

impl DaemonClient {
    pub fn new(base: String) -> Self {
        Self { base: base.trim_end_matches('/').to_string(), http: reqwest::Client::new() }
    }

    pub async fn get(&self, path: &str) -> Result<Value> {
        let response = self
            .http
            .get(format!("{}{}", self.base, path))
            .send()
            .await
            .map_err(connection_error)?;
        Self::parse(response).await
    }

    pub async fn post(&self, path: &str, body: Value) -> Result<Value> {
        let response = self
            .http
            .post(format!("{}{}", self.base, path))
            .json(&body)
            .send()
            .await
            .map_err(connection_error)?;
        Self::parse(response).await
    }

    pub async fn patch(&self, path: &str, body: Value) -> Result<Value> {
        let response = self
            .http
            .patch(format!("{}{}", self.base, path))
            .json(&body)
            .send()
            .await
            .map_err(connection_error)?;
        Self::parse(response).await
    }

    pub async fn delete(&self, path: &str) -> Result<Value> {
        let response = self
            .http
            .delete(format!("{}{}", self.base, path))
            .send()
            .await
            .map_err(connection_error)?;
        Self::parse(response).await
    }

    async fn parse(response: reqwest::Response) -> Result<Value> {
        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);
        if status.is_success() || status.as_u16() == 202 {
            return Ok(body);
        }
        let message = body
            .get("error")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("daemon returned {status}"));
        Err(anyhow!(message))
    }
}

fn connection_error(e: reqwest::Error) -> anyhow::Error {
    anyhow!("cannot reach gobbyd ({e}); is the daemon running?")
}
