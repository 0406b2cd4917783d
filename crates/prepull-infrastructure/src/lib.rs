//! Infrastructure for prepull: on-disk configuration and the local process
//! binding of the `TaskExecutor` capability set.

pub mod config_service;
pub mod paths;
pub mod process_executor;

pub use config_service::ConfigService;
pub use paths::PrepullPaths;
pub use process_executor::ProcessExecutor;
