use anyhow::{Context, Result};
use prepull_infrastructure::ConfigService;
use std::path::Path;

pub fn service(path: Option<&Path>) -> Result<ConfigService> {
    match path {
        Some(path) => Ok(ConfigService::with_path(path)),
        None => ConfigService::new().context("Failed to locate the config directory"),
    }
}

pub fn show(config: &ConfigService) -> Result<()> {
    let effective = config
        .get_config()
        .with_context(|| format!("Failed to load {}", config.path().display()))?;
    println!("# {}", config.path().display());
    print!("{}", effective.to_toml_string()?);
    Ok(())
}

pub fn init(config: &ConfigService) -> Result<()> {
    if config.ensure_config_file()? {
        println!("Wrote default configuration to {}", config.path().display());
    } else {
        println!("Configuration already exists at {}", config.path().display());
    }
    Ok(())
}
