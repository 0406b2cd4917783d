use crate::error::{PrepullError, Result};
use crate::task::{TaskId, task_ids};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

/// Upstream default for the upgrade prepull phase: five minutes.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_components() -> Vec<String> {
    ["etcd", "kube-apiserver", "kube-controller-manager", "kube-scheduler"]
        .iter()
        .map(|c| c.to_string())
        .collect()
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

/// Root configuration, read from `config.toml`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct PrepullConfig {
    /// Deadline for the whole wait-and-cleanup phase, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Components to prepull, created in this order.
    #[serde(default = "default_components")]
    pub components: Vec<String>,
    /// Upper bound on concurrently running waits. Unbounded when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_concurrent_waits: Option<usize>,
    #[serde(default)]
    pub process: ProcessConfig,
}

impl Default for PrepullConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            components: default_components(),
            max_concurrent_waits: None,
            process: ProcessConfig::default(),
        }
    }
}

impl PrepullConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn tasks(&self) -> Vec<TaskId> {
        task_ids(self.components.iter().cloned())
    }

    /// Rejects duplicate components and a zero concurrency bound.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for component in &self.components {
            if !seen.insert(component.as_str()) {
                return Err(PrepullError::config(format!(
                    "component '{}' is listed more than once",
                    component
                )));
            }
        }
        if self.max_concurrent_waits == Some(0) {
            return Err(PrepullError::config(
                "max_concurrent_waits must be at least 1",
            ));
        }
        if self.process.poll_interval_ms == 0 {
            return Err(PrepullError::config("process.poll_interval_ms must be > 0"));
        }
        Ok(())
    }
}

/// Settings for the local process executor.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ProcessConfig {
    /// Program spawned once per task.
    #[serde(default = "default_program")]
    pub program: String,
    #[serde(default = "default_args")]
    pub args: Vec<String>,
    /// Directory where tasks drop their readiness files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_dir: Option<PathBuf>,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_program() -> String {
    "/bin/sh".to_string()
}

fn default_args() -> Vec<String> {
    vec![
        "-c".to_string(),
        "touch \"$PREPULL_READY_FILE\" && exec sleep 3600".to_string(),
    ]
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: default_args(),
            state_dir: None,
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl ProcessConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
