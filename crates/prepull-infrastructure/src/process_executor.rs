//! Local process binding of the task executor.
//!
//! Each task is backed by one child process addressed by the task's
//! resource name. A task is ready once its process has created the marker
//! file passed to it in `PREPULL_READY_FILE`.

use crate::paths::PrepullPaths;
use async_trait::async_trait;
use prepull_core::config::ProcessConfig;
use prepull_core::task::{resource_name, selector_label};
use prepull_core::{PrepullError, Result, TaskExecutor, TaskId};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Mutex;
use std::time::Duration;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

/// Spawns, watches and kills one process per task.
///
/// Children are spawned with `kill_on_drop`, so dropping the executor
/// kills anything an aborted orchestration left running.
pub struct ProcessExecutor {
    program: String,
    args: Vec<String>,
    state_dir: PathBuf,
    poll_interval: Duration,
    /// Running children keyed by resource name.
    children: Mutex<HashMap<String, Child>>,
}

impl ProcessExecutor {
    pub fn new(config: &ProcessConfig) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
            state_dir: config
                .state_dir
                .clone()
                .unwrap_or_else(PrepullPaths::state_dir),
            poll_interval: config.poll_interval(),
            children: Mutex::new(HashMap::new()),
        }
    }

    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    /// Marker file whose existence means `task` is ready.
    pub fn ready_file(&self, task: &TaskId) -> PathBuf {
        self.state_dir.join(format!("{}.ready", resource_name(task)))
    }

    /// Number of children currently tracked.
    pub fn running(&self) -> usize {
        self.children.lock().map(|c| c.len()).unwrap_or(0)
    }

    fn spawn(&self, task: &TaskId, ready_file: &Path) -> std::io::Result<Child> {
        Command::new(&self.program)
            .args(&self.args)
            .env("PREPULL_TASK", task.as_str())
            .env("PREPULL_RESOURCE", resource_name(task))
            .env("PREPULL_SELECTOR", selector_label(task))
            .env("PREPULL_READY_FILE", ready_file)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .spawn()
    }

    fn children(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Child>>> {
        self.children
            .lock()
            .map_err(|_| PrepullError::internal("process table lock poisoned"))
    }
}

async fn remove_marker(path: &Path) -> std::io::Result<()> {
    match tokio::fs::remove_file(path).await {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

#[async_trait]
impl TaskExecutor for ProcessExecutor {
    async fn create(&self, task: &TaskId) -> Result<()> {
        let ready_file = self.ready_file(task);
        let wrap = |e: std::io::Error| {
            PrepullError::execution(format!(
                "unable to create a process for prepulling the component {:?}: {}",
                task.as_str(),
                e
            ))
        };

        tokio::fs::create_dir_all(&self.state_dir).await.map_err(wrap)?;
        // A marker left by an earlier run would report readiness too early
        remove_marker(&ready_file).await.map_err(wrap)?;

        let child = self.spawn(task, &ready_file).map_err(wrap)?;
        debug!(task = %task, pid = ?child.id(), "spawned prepull process");

        // Create-or-update: a process already registered under this name is replaced
        if let Some(mut previous) = self.children()?.insert(resource_name(task), child) {
            warn!(task = %task, "replacing existing prepull process");
            let _ = previous.start_kill();
        }
        Ok(())
    }

    async fn wait(&self, task: &TaskId) {
        info!("[upgrade/prepull] Prepulling image for component {}.", task);
        let ready_file = self.ready_file(task);

        loop {
            if tokio::fs::try_exists(&ready_file).await.unwrap_or(false) {
                return;
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn delete(&self, task: &TaskId) -> Result<()> {
        let name = resource_name(task);
        let wrap = |message: String| {
            PrepullError::execution(format!(
                "unable to cleanup the process used for prepulling {}: {}",
                task, message
            ))
        };

        let child = self.children()?.remove(&name);
        let Some(mut child) = child else {
            return Err(wrap(format!("no process named {:?}", name)));
        };

        match child.try_wait() {
            Ok(Some(status)) => debug!(task = %task, %status, "prepull process already exited"),
            _ => child.kill().await.map_err(|e| wrap(e.to_string()))?,
        }

        remove_marker(&self.ready_file(task))
            .await
            .map_err(|e| wrap(e.to_string()))?;
        Ok(())
    }
}
