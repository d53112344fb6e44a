mod cli;
mod commands;
mod config;
mod error;
mod output;
mod setup;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use config::CliConfig;
use panorama_ai::{NullStatus, StatusSink};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

fn log_dir() -> Result<PathBuf> {
    let dir = dirs::data_dir()
        .context("Failed to determine data directory")?
        .join("panorama")
        .join("logs");
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

fn init_logging(verbose: bool) -> Result<WorkerGuard> {
    let file_appender = tracing_appender::rolling::daily(log_dir()?, "panorama.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .init();
    Ok(guard)
}

async fn run(cli: Cli, config: CliConfig) -> Result<()> {
    let store = setup::prepare_store(&cli, &config).await?;

    match &cli.command {
        Commands::Tools => {
            let registry = setup::prepare_registry(store, None)?;
            commands::tools::list_tools(&registry, cli.format)
        }
        Commands::Ask(args) => {
            let index = setup::prepare_index(&config)?;
            let registry = setup::prepare_registry(store.clone(), index)?;

            let mut agent_config = config.agent.to_agent_config();
            if let Some(steps) = args.max_steps {
                agent_config = agent_config.with_max_steps(steps);
            }
            let status: Arc<dyn StatusSink> = if args.quiet || cli.format.is_json() {
                Arc::new(NullStatus)
            } else {
                Arc::new(commands::ask::ProgressStatus)
            };
            let agent =
                setup::prepare_agent(&cli, &config, agent_config, store, registry, status);

            let history = match &args.history {
                Some(path) => commands::ask::load_history(path)?,
                None => Vec::new(),
            };
            commands::ask::ask(&agent, &args.query_text(), &history, cli.format).await
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = CliConfig::load();
    config.apply_api_key_env();

    // Logging goes to a file so stdout stays clean for answers
    let guard = match init_logging(cli.verbose) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Warning: file logging disabled: {e:#}");
            None
        }
    };

    if let Err(err) = run(cli, config).await {
        drop(guard);
        error::handle_error(err);
    }
}
