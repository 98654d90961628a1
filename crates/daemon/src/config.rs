// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration
//!
//! A YAML file plus environment overrides. `GOBBY_DATABASE_PATH`,
//! `GOBBY_CONFIG_FILE`, and `GOBBY_LOGGING_*` redirect paths;
//! `GOBBY_TEST_PROTECT=1` forces safe defaults (temp state dir, no
//! WebSocket). The HTTP and WebSocket ports are independent and both
//! optional — the WebSocket server is disabled when its section is
//! absent.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DaemonConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub websocket: Option<WebSocketConfig>,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub agents: AgentConfig,
    #[serde(default)]
    pub scheduler: SchedulerSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Optional bearer token for REST/WS auth; local-first default is
    /// open.
    #[serde(default)]
    pub auth_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: default_host(), port: default_port(), auth_token: None }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSocketConfig {
    #[serde(default = "default_ws_port")]
    pub port: u16,
    /// Idle chat sessions are evicted after this many seconds.
    #[serde(default = "default_chat_idle")]
    pub chat_idle_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DatabaseConfig {
    /// Defaults to `<state dir>/gobby.db`.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), dir: None }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default)]
    pub enabled: bool,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,
    #[serde(default = "default_provider")]
    pub default_provider: String,
    /// Stale registry entries are reaped after this many seconds.
    #[serde(default = "default_stale_timeout")]
    pub stale_timeout_seconds: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            default_provider: default_provider(),
            stale_timeout_seconds: default_stale_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerSection {
    #[serde(default = "default_poll_seconds")]
    pub poll_seconds: u64,
    #[serde(default = "default_max_runs")]
    pub max_concurrent_runs: usize,
    #[serde(default = "default_auto_disable")]
    pub auto_disable_after: u32,
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            poll_seconds: default_poll_seconds(),
            max_concurrent_runs: default_max_runs(),
            auto_disable_after: default_auto_disable(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    8787
}
fn default_ws_port() -> u16 {
    8788
}
fn default_chat_idle() -> u64 {
    1800
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_max_depth() -> u32 {
    3
}
fn default_provider() -> String {
    "claude".to_string()
}
fn default_stale_timeout() -> u64 {
    3600
}
fn default_poll_seconds() -> u64 {
    15
}
fn default_max_runs() -> usize {
    4
}
fn default_auto_disable() -> u32 {
    5
}

impl DaemonConfig {
    /// Load from `GOBBY_CONFIG_FILE` (or the given path), then apply
    /// environment overrides. A missing file yields defaults.
    pub fn load(path: Option<&std::path::Path>) -> Self {
        let path = std::env::var_os("GOBBY_CONFIG_FILE")
            .map(PathBuf::from)
            .or_else(|| path.map(|p| p.to_path_buf()));
        let mut config = match path.as_deref().map(std::fs::read_to_string) {
            Some(Ok(text)) => match serde_yaml::from_str(&text) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!(error = %e, "invalid config file, using defaults");
                    Self::default()
                }
            },
            Some(Err(e)) => {
                tracing::warn!(error = %e, "config file unreadable, using defaults");
                Self::default()
            }
            None => Self::default(),
        };
        config.apply_env();
        config
    }

    fn apply_env(&mut self) {
        if let Ok(path) = std::env::var("GOBBY_DATABASE_PATH") {
            self.database.path = Some(PathBuf::from(path));
        }
        if let Ok(level) = std::env::var("GOBBY_LOGGING_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(dir) = std::env::var("GOBBY_LOGGING_DIR") {
            self.logging.dir = Some(PathBuf::from(dir));
        }
        if std::env::var("GOBBY_TEST_PROTECT").map(|v| v == "1").unwrap_or(false) {
            // Safe defaults for test mode: isolated state, no sockets
            // beyond the HTTP listener, no memory side effects.
            let tmp = std::env::temp_dir().join(format!("gobby-test-{}", std::process::id()));
            self.database.path = Some(tmp.join("gobby.db"));
            self.logging.dir = Some(tmp.join("logs"));
            self.websocket = None;
            self.memory.enabled = false;
        }
    }

    /// Database path with the state-dir default applied.
    pub fn database_path(&self, state_dir: &std::path::Path) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(|| state_dir.join("gobby.db"))
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
