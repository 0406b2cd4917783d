//! Task domain module.
//!
//! A task is one named unit of work carried through create → wait → delete.
//!
//! # Module Structure
//!
//! - `model`: the `TaskId` value object and the resource naming convention
//! - `executor`: the `TaskExecutor` capability set the orchestrator drives
//!
//! # Usage
//!
//! ```ignore
//! use prepull_core::task::{TaskExecutor, TaskId, resource_name};
//! ```

mod model;
pub mod executor;

// Re-export public API
pub use model::{
    PREPULL_LABEL_KEY, PREPULL_PREFIX, TaskId, resource_name, selector_label, task_ids,
};

pub use executor::TaskExecutor;
