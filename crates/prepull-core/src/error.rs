//! Error types for the prepull workspace.

use crate::task::TaskId;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// A shared error type for the entire prepull workspace.
///
/// The three orchestration outcomes (`CreationFailed`, `TimeoutExceeded`,
/// `CleanupFailed`) are terminal: the orchestrator surfaces exactly one of
/// them and never reports partial success. The remaining variants are what
/// executors, configuration loading and I/O produce as causes.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum PrepullError {
    /// Creating the resource for a task failed; no waits were started.
    #[error("creation failed for task '{task}': {message}")]
    CreationFailed { task: TaskId, message: String },

    /// Not every task completed wait and cleanup before the deadline.
    #[error("The prepull operation timed out after {timeout:?} ({} task(s) outstanding: {})", .outstanding.len(), join_ids(.outstanding))]
    TimeoutExceeded {
        timeout: Duration,
        outstanding: Vec<TaskId>,
    },

    /// Tearing down a task that became ready failed.
    #[error("cleanup failed for task '{task}': {message}")]
    CleanupFailed { task: TaskId, message: String },

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization {
        format: String, // "TOML", "JSON"
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Executor-side failure (spawn, kill, remote call)
    #[error("Execution error: {0}")]
    Execution(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

fn join_ids(ids: &[TaskId]) -> String {
    ids.iter()
        .map(TaskId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

impl PrepullError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Wraps an executor failure raised while creating `task`.
    pub fn creation_failed(task: &TaskId, cause: impl std::fmt::Display) -> Self {
        Self::CreationFailed {
            task: task.clone(),
            message: cause.to_string(),
        }
    }

    /// Wraps an executor failure raised while deleting `task`.
    pub fn cleanup_failed(task: &TaskId, cause: impl std::fmt::Display) -> Self {
        Self::CleanupFailed {
            task: task.clone(),
            message: cause.to_string(),
        }
    }

    /// Creates a timeout error listing the tasks that never finished.
    pub fn timeout(timeout: Duration, outstanding: Vec<TaskId>) -> Self {
        Self::TimeoutExceeded {
            timeout,
            outstanding,
        }
    }

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an Execution error
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is a creation failure
    pub fn is_creation_failed(&self) -> bool {
        matches!(self, Self::CreationFailed { .. })
    }

    /// Check if this is a timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::TimeoutExceeded { .. })
    }

    /// Check if this is a cleanup failure
    pub fn is_cleanup_failed(&self) -> bool {
        matches!(self, Self::CleanupFailed { .. })
    }

    /// Check if this is a config error
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// The task an orchestration error is attributed to, if any.
    pub fn task(&self) -> Option<&TaskId> {
        match self {
            Self::CreationFailed { task, .. } | Self::CleanupFailed { task, .. } => Some(task),
            _ => None,
        }
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for PrepullError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for PrepullError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for PrepullError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for PrepullError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, PrepullError>`.
pub type Result<T> = std::result::Result<T, PrepullError>;
