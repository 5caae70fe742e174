//! `hivemind` CLI entry point

use anyhow::{Context, Result};
use clap::Parser;
use hivemind::cli::commands::{consensus, init, memory, spawn, status, task};
use hivemind::cli::{Cli, Commands};
use hivemind::coordinator::Coordinator;
use hivemind::infrastructure::config::ConfigLoader;
use hivemind::infrastructure::logging::{LogConfig, LoggerImpl};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Init { force } = &cli.command {
        return init::execute(*force, cli.json).await;
    }

    let config = ConfigLoader::load().context("failed to load configuration")?;
    let log_config = LogConfig::from_domain(&config.logging, cli.verbose);
    let _logger = LoggerImpl::init(&log_config).context("failed to initialize logging")?;

    let coordinator = Coordinator::initialize(config)
        .await
        .context("failed to initialize coordinator")?;

    match cli.command {
        Commands::Init { .. } => unreachable!("Init is handled before the coordinator is built"),
        Commands::Spawn { objective, queen_type, max_workers, topology } => {
            spawn::execute(&coordinator, objective, queen_type, max_workers, topology, cli.json).await
        }
        Commands::Task(task_cmd) => task::execute(&coordinator, task_cmd, cli.json).await,
        Commands::Consensus(consensus_cmd) => consensus::execute(&coordinator, consensus_cmd, cli.json).await,
        Commands::Memory(memory_cmd) => memory::execute(&coordinator, memory_cmd, cli.json).await,
        Commands::Status => status::status(&coordinator, cli.json).await,
        Commands::Metrics => status::metrics(&coordinator).await,
        Commands::Shutdown => status::shutdown(&coordinator, cli.json).await,
    }
}
