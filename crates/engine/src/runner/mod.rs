// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent runner
//!
//! Spawns child assistant processes in one of four modes and tracks
//! them in the running-agent registry plus the durable agents table.
//! Depth is enforced against the parent session's ancestor chain;
//! worktree/clone isolation gives writing agents their own tree.

pub mod isolation;

use crate::llm::{LlmRequest, LlmService};
use crate::registry::RunningAgentRegistry;
use crate::EngineError;
use gobby_adapters::SessionAdapter;
use gobby_core::{
    utc_now_iso, AgentMode, AgentRunId, IsolationMode, RunningAgent, SessionSource, WorktreeId,
};
use gobby_storage::sessions::RegisterSession;
use gobby_storage::{AgentStore, ProjectStore, SessionStore, WorktreeStore};
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

/// Runner configuration.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Maximum ancestor chain length for a child (root = 0).
    pub max_depth: u32,
    pub default_provider: String,
    /// Provider → CLI command. `{prompt}` is replaced with the task
    /// prompt.
    pub provider_commands: HashMap<String, String>,
    /// Directory for headless stdio logs.
    pub logs_dir: PathBuf,
    /// Directory where isolation worktrees and clones are created.
    pub worktrees_dir: PathBuf,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        let mut provider_commands = HashMap::new();
        provider_commands.insert("claude".to_string(), "claude -p \"{prompt}\"".to_string());
        Self {
            max_depth: 3,
            default_provider: "claude".to_string(),
            provider_commands,
            logs_dir: PathBuf::from("logs"),
            worktrees_dir: PathBuf::from("worktrees"),
        }
    }
}

/// Request to spawn a child agent.
#[derive(Debug, Clone, Default)]
pub struct SpawnRequest {
    pub agent: String,
    pub task: Option<String>,
    pub prompt: Option<String>,
    pub workflow: Option<String>,
    pub parent_session_id: String,
    pub mode: Option<AgentMode>,
    pub provider: Option<String>,
    pub terminal: Option<String>,
    pub isolation: Option<IsolationMode>,
}

/// Result of a successful spawn.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SpawnResult {
    pub run_id: AgentRunId,
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worktree_id: Option<WorktreeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch_name: Option<String>,
}

pub struct AgentRunner {
    sessions: SessionStore,
    projects: ProjectStore,
    worktrees: WorktreeStore,
    agents: AgentStore,
    registry: Arc<RunningAgentRegistry>,
    terminal: Arc<dyn SessionAdapter>,
    /// Drives `in_process` mode; absent means that mode is refused.
    llm: Option<Arc<dyn LlmService>>,
    config: RunnerConfig,
}

impl AgentRunner {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sessions: SessionStore,
        projects: ProjectStore,
        worktrees: WorktreeStore,
        agents: AgentStore,
        registry: Arc<RunningAgentRegistry>,
        terminal: Arc<dyn SessionAdapter>,
        llm: Option<Arc<dyn LlmService>>,
        config: RunnerConfig,
    ) -> Self {
        Self { sessions, projects, worktrees, agents, registry, terminal, llm, config }
    }

    pub fn registry(&self) -> &Arc<RunningAgentRegistry> {
        &self.registry
    }

    /// Whether a child may be spawned under `parent_session_id`.
    ///
    /// Returns `(allowed, reason, current_depth)`; consulted by dry-run
    /// evaluation and by orchestration actions before reserving slots.
    pub fn can_spawn(&self, parent_session_id: &str) -> Result<(bool, String, u32), EngineError> {
        let parent = self.sessions.get(parent_session_id)?;
        let child_depth = parent.agent_depth + 1;
        if child_depth > self.config.max_depth {
            return Ok((
                false,
                format!(
                    "SPAWN_DEPTH_EXCEEDED: child depth {child_depth} exceeds max {}",
                    self.config.max_depth
                ),
                parent.agent_depth,
            ));
        }
        Ok((true, String::new(), parent.agent_depth))
    }

    /// Spawn a child agent end to end: depth check, child session row,
    /// optional isolation, process start, registry + history records.
    pub async fn spawn(&self, request: SpawnRequest) -> Result<SpawnResult, EngineError> {
        let parent = self.sessions.get(&request.parent_session_id)?;
        let (allowed, _reason, current_depth) = self.can_spawn(&request.parent_session_id)?;
        if !allowed {
            return Err(EngineError::DepthExceeded {
                current_depth,
                max_depth: self.config.max_depth,
            });
        }

        let run_id = AgentRunId::new();
        let mode = request.mode.unwrap_or(AgentMode::Headless);
        let provider = request
            .provider
            .clone()
            .unwrap_or_else(|| self.config.default_provider.clone());

        // Child session row inherits the parent's identity tuple scope.
        let child = self.sessions.register(
            &format!("agent-{}", run_id.suffix()),
            &parent.machine_id,
            parent.source,
            &parent.project_id,
            RegisterSession {
                parent_session_id: Some(parent.id.clone()),
                agent_depth: Some(parent.agent_depth + 1),
                title: Some(request.agent.clone()),
                ..Default::default()
            },
        )?;

        // Isolation, when requested, happens before the process starts
        // so the child's cwd is ready.
        let project = self.projects.get(&parent.project_id).ok();
        let repo_path = project.as_ref().map(|p| PathBuf::from(&p.repo_path));
        let mut worktree_id = None;
        let mut branch_name = None;
        let mut cwd = repo_path.clone().unwrap_or_else(|| PathBuf::from("."));

        if let (Some(isolation), Some(repo), Some(project)) =
            (request.isolation, repo_path.as_ref(), project.as_ref())
        {
            let branch = format!("gobby/{}", run_id.suffix());
            let dest = self.config.worktrees_dir.join(run_id.suffix());
            match isolation {
                IsolationMode::Worktree => {
                    isolation::create_worktree(repo, &dest, &branch, None).await?;
                }
                IsolationMode::Clone => {
                    isolation::create_clone(repo, &dest).await?;
                }
            }
            isolation::propagate_sidecar(repo, &dest, &project.id, &project.name)?;
            let record = self.worktrees.create(
                &project.id,
                &dest.to_string_lossy(),
                &branch,
            )?;
            worktree_id = Some(record.id);
            branch_name = Some(branch);
            cwd = dest;
        }

        let prompt = request.prompt.clone().unwrap_or_default();
        let command = self.compose_command(&provider, &prompt);
        let env = self.child_env(&child.id, &parent.id, parent.source);

        let (pid, terminal_type) = match mode {
            AgentMode::Terminal => {
                let session_name = format!("agent-{}", run_id.short(8));
                self.terminal
                    .spawn(&session_name, &cwd, &command, &env)
                    .await
                    .map_err(|e| EngineError::SpawnFailed(e.to_string()))?;
                (None, Some(request.terminal.clone().unwrap_or_else(|| "tmux".to_string())))
            }
            AgentMode::Headless | AgentMode::Embedded => {
                let pid = self.spawn_headless(&run_id, &command, &cwd, &env)?;
                (Some(pid), None)
            }
            AgentMode::InProcess => {
                // Requires the LLM seam; checked before registration so
                // a refusal leaves no stray registry entry.
                if self.llm.is_none() {
                    return Err(EngineError::LlmUnavailable);
                }
                (None, None)
            }
        };

        let agent = RunningAgent {
            run_id: run_id.clone(),
            session_id: child.id.clone(),
            parent_session_id: parent.id.clone(),
            mode,
            started_at: utc_now_iso(),
            pid,
            master_fd: None,
            terminal_type,
            provider: provider.clone(),
            workflow_name: request.workflow.clone(),
            worktree_id: worktree_id.clone(),
        };
        self.registry.add(agent);
        self.agents.record_start(
            &run_id,
            &child.id,
            &parent.id,
            mode,
            &provider,
            request.workflow.as_deref(),
        )?;

        // The in-process task starts only after registration so its
        // completion callback finds the registry entry.
        if mode == AgentMode::InProcess {
            self.spawn_in_process(run_id.clone(), &prompt)?;
        }

        Ok(SpawnResult { run_id, session_id: child.id, pid, worktree_id, branch_name })
    }

    /// Record a terminal state for a run: completed, failed, cancelled,
    /// or timeout.
    pub fn finish(&self, run_id: &AgentRunId, status: &str, reason: Option<&str>) {
        self.registry.remove(run_id, status);
        if let Err(e) = self.agents.record_finish(run_id, status, reason) {
            tracing::warn!(%run_id, error = %e, "failed to persist agent finish");
        }
    }

    /// Probe registered PIDs and clean up the dead ones.
    pub fn reap_dead(&self) -> Vec<AgentRunId> {
        let dead: Vec<u32> = self
            .registry
            .list_all()
            .into_iter()
            .filter_map(|a| a.pid)
            .filter(|pid| !pid_alive(*pid))
            .collect();
        let removed = self.registry.cleanup_by_pids(&dead);
        for agent in &removed {
            if let Err(e) = self.agents.record_finish(&agent.run_id, "completed", Some("dead_pid")) {
                tracing::warn!(run_id = %agent.run_id, error = %e, "failed to persist reap");
            }
        }
        removed.into_iter().map(|a| a.run_id).collect()
    }

    fn compose_command(&self, provider: &str, prompt: &str) -> String {
        let template = self
            .config
            .provider_commands
            .get(provider)
            .cloned()
            .unwrap_or_else(|| format!("{provider} \"{{prompt}}\""));
        template.replace("{prompt}", &prompt.replace('"', "\\\""))
    }

    fn child_env(
        &self,
        session_id: &str,
        parent_session_id: &str,
        source: SessionSource,
    ) -> Vec<(String, String)> {
        vec![
            ("GOBBY_SESSION_ID".to_string(), session_id.to_string()),
            ("GOBBY_PARENT_SESSION_ID".to_string(), parent_session_id.to_string()),
            ("GOBBY_SOURCE".to_string(), source.as_str().to_string()),
        ]
    }

    fn spawn_headless(
        &self,
        run_id: &AgentRunId,
        command: &str,
        cwd: &std::path::Path,
        env: &[(String, String)],
    ) -> Result<u32, EngineError> {
        std::fs::create_dir_all(&self.config.logs_dir)
            .map_err(|e| EngineError::SpawnFailed(format!("create logs dir: {e}")))?;
        let stdout = std::fs::File::create(
            self.config.logs_dir.join(format!("{}.out.log", run_id.suffix())),
        )
        .map_err(|e| EngineError::SpawnFailed(format!("create log: {e}")))?;
        let stderr = std::fs::File::create(
            self.config.logs_dir.join(format!("{}.err.log", run_id.suffix())),
        )
        .map_err(|e| EngineError::SpawnFailed(format!("create log: {e}")))?;

        let mut cmd = tokio::process::Command::new("sh");
        cmd.arg("-c")
            .arg(command)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr));
        for (key, value) in env {
            cmd.env(key, value);
        }
        let child = cmd.spawn().map_err(|e| EngineError::SpawnFailed(e.to_string()))?;
        child
            .id()
            .ok_or_else(|| EngineError::SpawnFailed("child exited before pid read".to_string()))
    }

    /// In-process mode runs the assistant through the LLM seam as a
    /// daemon task; its terminal status lands in the registry.
    fn spawn_in_process(&self, run_id: AgentRunId, prompt: &str) -> Result<(), EngineError> {
        let llm = self.llm.clone().ok_or(EngineError::LlmUnavailable)?;
        let registry = Arc::clone(&self.registry);
        let agents = self.agents.clone();
        let request = LlmRequest { prompt: prompt.to_string(), ..Default::default() };
        tokio::spawn(async move {
            let status = match llm.complete(request).await {
                Ok(_) => "completed",
                Err(e) => {
                    tracing::warn!(%run_id, error = %e, "in-process agent failed");
                    "failed"
                }
            };
            registry.remove(&run_id, status);
            if let Err(e) = agents.record_finish(&run_id, status, None) {
                tracing::warn!(%run_id, error = %e, "failed to persist in-process finish");
            }
        });
        Ok(())
    }
}

/// Probe a PID with signal 0.
fn pid_alive(pid: u32) -> bool {
    nix::sys::signal::kill(nix::unistd::Pid::from_raw(pid as i32), None).is_ok()
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
