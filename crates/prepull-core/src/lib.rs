//! Domain types for the prepull orchestrator: task identifiers, the
//! executor capability set, configuration and the shared error type.

pub mod config;
pub mod error;
pub mod task;

// Re-export common error type
pub use error::{PrepullError, Result};
pub use task::{TaskExecutor, TaskId};
