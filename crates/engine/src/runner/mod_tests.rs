// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_helpers::TestWorld;
use gobby_adapters::FakeSessionAdapter;
use gobby_storage::AgentStore;

fn runner_for(world: &TestWorld, terminal: Arc<FakeSessionAdapter>) -> AgentRunner {
    let registry = Arc::new(crate::registry::RunningAgentRegistry::new());
    AgentRunner::new(
        world.sessions.clone(),
        world.projects.clone(),
        gobby_storage::WorktreeStore::new(Arc::clone(&world.db)),
        AgentStore::new(Arc::clone(&world.db)),
        registry,
        terminal,
        Some(Arc::clone(&world.llm) as Arc<dyn crate::llm::LlmService>),
        RunnerConfig {
            logs_dir: world.workdir.path().join("logs"),
            worktrees_dir: world.workdir.path().join("wt"),
            ..Default::default()
        },
    )
}

#[tokio::test]
async fn can_spawn_allows_shallow_chains() {
    let world = TestWorld::new();
    let runner = runner_for(&world, Arc::new(FakeSessionAdapter::new()));
    let parent = world.session("root");
    let (allowed, reason, depth) = runner.can_spawn(&parent.id).unwrap();
    assert!(allowed);
    assert!(reason.is_empty());
    assert_eq!(depth, 0);
}

#[tokio::test]
async fn can_spawn_refuses_at_max_depth() {
    let world = TestWorld::new();
    let runner = runner_for(&world, Arc::new(FakeSessionAdapter::new()));
    let deep = world
        .sessions
        .register(
            "deep",
            "m1",
            gobby_core::SessionSource::Claude,
            "p1",
            gobby_storage::sessions::RegisterSession {
                agent_depth: Some(3),
                ..Default::default()
            },
        )
        .unwrap();
    let (allowed, reason, depth) = runner.can_spawn(&deep.id).unwrap();
    assert!(!allowed);
    assert!(reason.contains("SPAWN_DEPTH_EXCEEDED"));
    assert_eq!(depth, 3);
}

#[tokio::test]
async fn terminal_spawn_registers_agent_and_child_session() {
    let world = TestWorld::new();
    let repo = world.workdir.path().join("repo");
    std::fs::create_dir_all(&repo).unwrap();
    let project = world.projects.ensure(&repo, "demo").unwrap();
    let parent = world
        .sessions
        .register(
            "root",
            "m1",
            gobby_core::SessionSource::Claude,
            &project.id,
            Default::default(),
        )
        .unwrap();

    let terminal = Arc::new(FakeSessionAdapter::new());
    let runner = runner_for(&world, Arc::clone(&terminal));

    let result = runner
        .spawn(SpawnRequest {
            agent: "builder".to_string(),
            prompt: Some("build it".to_string()),
            parent_session_id: parent.id.clone(),
            mode: Some(gobby_core::AgentMode::Terminal),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(terminal.session_count(), 1);
    assert!(runner.registry().get(&result.run_id).is_some());

    let child = world.sessions.get(&result.session_id).unwrap();
    assert_eq!(child.parent_session_id.as_deref(), Some(parent.id.as_str()));
    assert_eq!(child.agent_depth, 1);
}

#[tokio::test]
async fn spawn_past_depth_limit_errors() {
    let world = TestWorld::new();
    let runner = runner_for(&world, Arc::new(FakeSessionAdapter::new()));
    let deep = world
        .sessions
        .register(
            "deep",
            "m1",
            gobby_core::SessionSource::Claude,
            "p1",
            gobby_storage::sessions::RegisterSession {
                agent_depth: Some(3),
                ..Default::default()
            },
        )
        .unwrap();
    let err = runner
        .spawn(SpawnRequest {
            agent: "x".to_string(),
            parent_session_id: deep.id,
            mode: Some(gobby_core::AgentMode::Terminal),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "depth_exceeded");
}

#[tokio::test]
async fn failed_terminal_spawn_propagates() {
    let world = TestWorld::new();
    let terminal = Arc::new(FakeSessionAdapter::new());
    terminal.fail_spawns();
    let runner = runner_for(&world, Arc::clone(&terminal));
    let parent = world.session("root");
    let err = runner
        .spawn(SpawnRequest {
            agent: "x".to_string(),
            parent_session_id: parent.id,
            mode: Some(gobby_core::AgentMode::Terminal),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "internal");
}

#[tokio::test]
async fn finish_removes_from_registry_and_records_history() {
    let world = TestWorld::new();
    let runner = runner_for(&world, Arc::new(FakeSessionAdapter::new()));
    let parent = world.session("root");
    let result = runner
        .spawn(SpawnRequest {
            agent: "x".to_string(),
            parent_session_id: parent.id,
            mode: Some(gobby_core::AgentMode::Terminal),
            ..Default::default()
        })
        .await
        .unwrap();

    runner.finish(&result.run_id, "cancelled", Some("user request"));
    assert!(runner.registry().get(&result.run_id).is_none());
    let record = AgentStore::new(Arc::clone(&world.db)).get(&result.run_id).unwrap();
    assert_eq!(record.status, "cancelled");
    assert_eq!(record.exit_reason.as_deref(), Some("user request"));
}

#[tokio::test]
async fn in_process_mode_completes_via_llm() {
    let world = TestWorld::new();
    let runner = runner_for(&world, Arc::new(FakeSessionAdapter::new()));
    let parent = world.session("root");
    let result = runner
        .spawn(SpawnRequest {
            agent: "thinker".to_string(),
            prompt: Some("solve".to_string()),
            parent_session_id: parent.id,
            mode: Some(gobby_core::AgentMode::InProcess),
            ..Default::default()
        })
        .await
        .unwrap();

    // The in-process task resolves quickly against the fake LLM.
    for _ in 0..100 {
        if runner.registry().get(&result.run_id).is_none() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    let record = AgentStore::new(Arc::clone(&world.db)).get(&result.run_id).unwrap();
    assert_eq!(record.status, "completed");
}
