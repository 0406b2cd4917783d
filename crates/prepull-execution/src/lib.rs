//! Execution layer: the deadline-aware fan-in collector, the parallel
//! create/wait/delete orchestrator and the event-streaming tracing layer.

pub mod collector;
pub mod parallel;
pub mod tracing_layer;

pub use collector::{CollectError, collect_n};
pub use parallel::{ParallelPrepuller, prepull_in_parallel};
