// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;

fn clear_env() {
    for key in [
        "GOBBY_CONFIG_FILE",
        "GOBBY_DATABASE_PATH",
        "GOBBY_LOGGING_LEVEL",
        "GOBBY_LOGGING_DIR",
        "GOBBY_TEST_PROTECT",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
#[serial]
fn defaults_without_file_or_env() {
    clear_env();
    let config = DaemonConfig::load(None);
    assert_eq!(config.server.port, 8787);
    assert!(config.websocket.is_none());
    assert!(config.database.path.is_none());
    assert_eq!(config.logging.level, "info");
    assert!(config.memory.enabled);
    assert_eq!(config.agents.max_depth, 3);
}

#[test]
#[serial]
fn loads_yaml_file() {
    clear_env();
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("config.yaml");
    std::fs::write(
        &path,
        "server:\n  port: 9999\nwebsocket:\n  port: 9998\nlogging:\n  level: debug\n",
    )
    .unwrap();
    let config = DaemonConfig::load(Some(&path));
    assert_eq!(config.server.port, 9999);
    assert_eq!(config.websocket.unwrap().port, 9998);
    assert_eq!(config.logging.level, "debug");
}

#[test]
#[serial]
fn env_overrides_file() {
    clear_env();
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("config.yaml");
    std::fs::write(&path, "logging:\n  level: warn\n").unwrap();
    std::env::set_var("GOBBY_LOGGING_LEVEL", "trace");
    std::env::set_var("GOBBY_DATABASE_PATH", "/tmp/custom.db");
    let config = DaemonConfig::load(Some(&path));
    clear_env();
    assert_eq!(config.logging.level, "trace");
    assert_eq!(config.database.path, Some(PathBuf::from("/tmp/custom.db")));
}

#[test]
#[serial]
fn test_protect_forces_safe_defaults() {
    clear_env();
    std::env::set_var("GOBBY_TEST_PROTECT", "1");
    let config = DaemonConfig::load(None);
    clear_env();
    assert!(config.websocket.is_none());
    assert!(!config.memory.enabled);
    let db = config.database.path.unwrap();
    assert!(db.starts_with(std::env::temp_dir()));
}

#[test]
#[serial]
fn invalid_yaml_falls_back_to_defaults() {
    clear_env();
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("config.yaml");
    std::fs::write(&path, ": : :").unwrap();
    let config = DaemonConfig::load(Some(&path));
    assert_eq!(config.server.port, 8787);
}

#[test]
#[serial]
fn database_path_defaults_into_state_dir() {
    clear_env();
    let config = DaemonConfig::load(None);
    let path = config.database_path(std::path::Path::new("/state"));
    assert_eq!(path, PathBuf::from("/state/gobby.db"));
}
