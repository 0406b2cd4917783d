//! Path management for prepull configuration and runtime state.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/prepull/           # Config directory
//! └── config.toml              # PrepullConfig
//!
//! ~/.cache/prepull/            # State directory
//! └── ready/                   # Readiness markers, one per resource
//!     └── upgrade-prepull-<component>.ready
//! ```

use prepull_core::{PrepullError, Result};
use std::path::PathBuf;

const APP_NAME: &str = "prepull";

pub struct PrepullPaths;

impl PrepullPaths {
    /// Returns the prepull configuration directory (e.g. `~/.config/prepull/`).
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_NAME))
            .ok_or_else(|| PrepullError::config("Cannot find config directory"))
    }

    /// Returns the path to the main configuration file.
    pub fn config_file() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Directory for readiness markers written by spawned tasks.
    ///
    /// Falls back to the system temp directory when no cache directory is
    /// known for the platform.
    pub fn state_dir() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join(APP_NAME)
            .join("ready")
    }
}
