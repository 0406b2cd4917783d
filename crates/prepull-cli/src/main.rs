use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

use commands::logging::LogFormat;

#[derive(Parser)]
#[command(name = "prepull")]
#[command(about = "Create, wait for and clean up prepull tasks in parallel under one deadline", long_about = None)]
struct Cli {
    /// Log output format (filter with RUST_LOG)
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    /// Path to config.toml (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Prepull the given components (or the configured ones)
    Run(commands::run::RunArgs),
    /// Print the resource name and selector label for each component
    Names {
        components: Vec<String>,
    },
    /// Inspect or create the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Write the default configuration if none exists
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = commands::config::service(cli.config.as_deref())?;

    match cli.command {
        // Run installs its own subscriber so it can attach the event stream
        Commands::Run(args) => commands::run::run(&config, args, cli.log_format).await?,
        Commands::Names { components } => {
            commands::logging::init(cli.log_format, None)?;
            commands::names::print(&config, components)?
        }
        Commands::Config { action } => {
            commands::logging::init(cli.log_format, None)?;
            match action {
                ConfigAction::Show => commands::config::show(&config)?,
                ConfigAction::Init => commands::config::init(&config)?,
            }
        }
    }

    Ok(())
}
