//! Configuration service implementation.
//!
//! Loads `PrepullConfig` from a TOML file (by default
//! `~/.config/prepull/config.toml`) and caches it.

use crate::paths::PrepullPaths;
use prepull_core::config::PrepullConfig;
use prepull_core::{PrepullError, Result};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Configuration service that loads and caches the prepull configuration.
///
/// A missing file is not an error: defaults are used instead. A file that
/// exists but does not parse or validate is reported.
#[derive(Debug, Clone)]
pub struct ConfigService {
    path: PathBuf,
    /// Cached configuration loaded from file.
    config: Arc<RwLock<Option<PrepullConfig>>>,
}

impl ConfigService {
    /// Creates a service reading the default config file location.
    pub fn new() -> Result<Self> {
        Ok(Self::with_path(PrepullPaths::config_file()?))
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            config: Arc::new(RwLock::new(None)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Gets the configuration, loading from file if not cached.
    pub fn get_config(&self) -> Result<PrepullConfig> {
        {
            let read_lock = self.config.read().map_err(|_| poisoned())?;
            if let Some(ref cached) = *read_lock {
                return Ok(cached.clone());
            }
        }

        let loaded = Self::load_config(&self.path)?;

        let mut write_lock = self.config.write().map_err(|_| poisoned())?;
        *write_lock = Some(loaded.clone());
        Ok(loaded)
    }

    /// Invalidates the cache, forcing a reload on next access.
    pub fn invalidate_cache(&self) {
        if let Ok(mut write_lock) = self.config.write() {
            *write_lock = None;
        }
    }

    /// Writes the default configuration if no file exists yet.
    ///
    /// Returns `true` when a file was written.
    pub fn ensure_config_file(&self) -> Result<bool> {
        if self.path.exists() {
            return Ok(false);
        }
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, PrepullConfig::default().to_toml_string()?)?;
        self.invalidate_cache();
        Ok(true)
    }

    fn load_config(path: &Path) -> Result<PrepullConfig> {
        if !path.exists() {
            debug!(path = %path.display(), "config file missing, using defaults");
            return Ok(PrepullConfig::default());
        }

        let content = std::fs::read_to_string(path)?;
        PrepullConfig::from_toml_str(&content).map_err(|e| match e {
            PrepullError::Serialization { format, message } => PrepullError::Serialization {
                format,
                message: format!("{}: {}", path.display(), message),
            },
            other => other,
        })
    }
}

fn poisoned() -> PrepullError {
    PrepullError::internal("config cache lock poisoned")
}
