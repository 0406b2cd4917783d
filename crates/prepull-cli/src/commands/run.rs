use anyhow::{Context, Result, bail};
use clap::Args;
use prepull_core::config::PrepullConfig;
use prepull_core::task::task_ids;
use prepull_execution::ParallelPrepuller;
use prepull_execution::tracing_layer::{PrepullEvent, PrepullEventLayer};
use prepull_infrastructure::{ConfigService, ProcessExecutor};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

use super::logging::{self, LogFormat};

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Components to prepull; defaults to the configured list
    pub components: Vec<String>,

    /// Overall deadline in seconds for waiting and cleanup
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Maximum number of concurrent waits
    #[arg(long)]
    pub max_concurrent: Option<usize>,

    /// Stream progress events to stdout as JSON lines
    #[arg(long)]
    pub events: bool,
}

/// Dropping the executor on return kills every child it still owns.
const INTERRUPTED: &str = "Interrupted; stopped the processes started by this run";

/// Applies command-line overrides on top of the file configuration.
fn effective_config(mut config: PrepullConfig, args: &RunArgs) -> Result<PrepullConfig> {
    if !args.components.is_empty() {
        config.components = args.components.clone();
    }
    if let Some(timeout) = args.timeout {
        config.timeout_secs = timeout;
    }
    if args.max_concurrent.is_some() {
        config.max_concurrent_waits = args.max_concurrent;
    }
    config.validate()?;
    Ok(config)
}

pub async fn run(config: &ConfigService, args: RunArgs, format: LogFormat) -> Result<()> {
    let (layer, events) = if args.events {
        let (layer, rx) = PrepullEventLayer::channel();
        (Some(layer.with_target_prefix("prepull")), Some(rx))
    } else {
        (None, None)
    };
    logging::init(format, layer)?;

    let file_config = config
        .get_config()
        .with_context(|| format!("Failed to load {}", config.path().display()))?;
    let effective = effective_config(file_config, &args)?;
    tracing::debug!(path = %config.path().display(), ?effective, "effective configuration");

    let executor = Arc::new(ProcessExecutor::new(&effective.process));
    let prepuller = ParallelPrepuller::new(executor, effective.timeout())
        .with_max_concurrent_waits(effective.max_concurrent_waits);
    let tasks = task_ids(effective.components.iter().cloned());

    tokio::select! {
        result = drive(prepuller.run(&tasks), events) => result?,
        _ = tokio::signal::ctrl_c() => bail!(INTERRUPTED),
    }

    Ok(())
}

/// Awaits `run`, printing streamed events as they arrive.
async fn drive<F, T>(run: F, events: Option<UnboundedReceiver<PrepullEvent>>) -> T
where
    F: Future<Output = T>,
{
    let Some(mut events) = events else {
        return run.await;
    };

    tokio::pin!(run);
    let result = loop {
        tokio::select! {
            result = &mut run => break result,
            Some(event) = events.recv() => println!("{}", event.to_json_line()),
        }
    };

    while let Ok(event) = events.try_recv() {
        println!("{}", event.to_json_line());
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(components: &[&str]) -> RunArgs {
        RunArgs {
            components: components.iter().map(|c| c.to_string()).collect(),
            timeout: None,
            max_concurrent: None,
            events: false,
        }
    }

    #[test]
    fn test_file_config_used_without_overrides() {
        let config = effective_config(PrepullConfig::default(), &args(&[])).unwrap();
        assert_eq!(config, PrepullConfig::default());
    }

    #[test]
    fn test_cli_overrides_win() {
        let mut run_args = args(&["etcd"]);
        run_args.timeout = Some(7);
        run_args.max_concurrent = Some(3);

        let config = effective_config(PrepullConfig::default(), &run_args).unwrap();
        assert_eq!(config.components, vec!["etcd"]);
        assert_eq!(config.timeout_secs, 7);
        assert_eq!(config.max_concurrent_waits, Some(3));
    }

    #[test]
    fn test_duplicate_cli_components_rejected() {
        assert!(effective_config(PrepullConfig::default(), &args(&["etcd", "etcd"])).is_err());
    }

    #[test]
    fn test_interrupt_message_reports_stopped_processes() {
        assert!(INTERRUPTED.contains("stopped"));
        assert!(!INTERRUPTED.contains("manual cleanup"));
    }

    #[tokio::test]
    async fn test_drive_returns_run_output() {
        let (_layer, rx) = PrepullEventLayer::channel();

        assert_eq!(drive(async { 42 }, Some(rx)).await, 42);
        assert_eq!(drive(async { 7 }, None).await, 7);
    }
}
