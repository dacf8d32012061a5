//! ChainFeed CLI.
//!
//! # Commands
//! ```text
//! chainfeed run       [--origin-block <hex>] [--poll-interval-ms <ms>]
//! chainfeed discover
//! chainfeed config
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chainfeed_core::config::PRODUCTION_ORIGIN_BLOCK;
use chainfeed_core::logging::init_tracing;
use chainfeed_core::{BlockNumber, ConsumerConfig, MemoryQueue};
use chainfeed_evm::{Consumer, ConsumerBuilder};
use chainfeed_handlers::{default_registry, JobWorker, LoggingSink};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(
    name = "chainfeed",
    about = "Contract event consumer: registry discovery, log polling, job dispatch",
    long_about = "
ChainFeed discovers contracts through an on-chain registry, polls eth_getLogs
for each one, decodes the events and hands them to handlers through a queue.

ENVIRONMENT VARIABLES:
  CHAINFEED_RPC_URL   JSON-RPC endpoint (overrides rpc_url)
  RUST_LOG            log filter when no level is configured
",
    version
)]
struct Cli {
    /// YAML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// JSON-RPC endpoint
    #[arg(long, env = "CHAINFEED_RPC_URL", global = true)]
    rpc_url: Option<String>,

    /// Log level or filter directive, e.g. `debug` or `info,chainfeed_evm=debug`
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Emit JSON logs
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover contracts and poll them until Ctrl-C (default)
    Run {
        /// First block to scan when no cursor is stored (hex or decimal)
        #[arg(long)]
        origin_block: Option<String>,
        /// Start from the production deployment block
        #[arg(long, conflicts_with = "origin_block")]
        production: bool,
        /// Poll interval per contract
        #[arg(long)]
        poll_interval_ms: Option<u64>,
    },

    /// List the contracts the registry reports, then exit
    Discover,

    /// Print the effective configuration as JSON
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = load_config(&cli)?;

    let command = cli.command.unwrap_or(Commands::Run {
        origin_block: None,
        production: false,
        poll_interval_ms: None,
    });

    if let Commands::Run { origin_block, production, poll_interval_ms } = &command {
        if let Some(block) = origin_block {
            config.origin_block = parse_block(block)?;
        }
        if *production {
            config.origin_block = PRODUCTION_ORIGIN_BLOCK;
        }
        if let Some(ms) = poll_interval_ms {
            config.poll_interval_ms = *ms;
        }
    }

    init_tracing(&config.log);
    config.validate().context("invalid configuration")?;

    match command {
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
        Commands::Discover => cmd_discover(config).await,
        Commands::Run { .. } => cmd_run(config).await,
    }
}

fn load_config(cli: &Cli) -> Result<ConsumerConfig> {
    let mut config = match &cli.config {
        Some(path) => ConsumerConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => ConsumerConfig::default(),
    };
    if let Some(url) = &cli.rpc_url {
        config.rpc_url = url.clone();
    }
    if let Some(level) = &cli.log_level {
        config.log.level = Some(level.clone());
    }
    if cli.json_logs {
        config.log.json = true;
    }
    Ok(config)
}

fn parse_block(s: &str) -> Result<BlockNumber> {
    let block = if s.starts_with("0x") || s.starts_with("0X") {
        BlockNumber::from_hex(s)?
    } else {
        BlockNumber(s.parse().with_context(|| format!("invalid block number: {s}"))?)
    };
    Ok(block)
}

fn build_consumer(config: ConsumerConfig, queue: Arc<MemoryQueue>) -> Result<Consumer> {
    ConsumerBuilder::new(config)
        .queue(queue)
        .build()
        .context("building consumer")
}

async fn cmd_discover(config: ConsumerConfig) -> Result<()> {
    let consumer = build_consumer(config, Arc::new(MemoryQueue::new()))?;
    let instances = consumer.discover().await;
    for instance in &instances {
        println!("{:<12} {}", instance.family, instance.address);
    }
    println!("{} contract(s), {} event layout(s)", instances.len(), consumer.decode_table().len());
    Ok(())
}

async fn cmd_run(config: ConsumerConfig) -> Result<()> {
    let queue = Arc::new(MemoryQueue::new());
    let handlers = Arc::new(default_registry(Arc::new(LoggingSink::new()), &config.handlers));
    let consumer = build_consumer(config, queue.clone())?;
    let worker = JobWorker::new(queue, handlers);

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("shutdown requested"),
            Err(e) => tracing::error!(error = %e, "unable to listen for Ctrl-C"),
        }
        shutdown.cancel();
    });

    let worker_cancel = cancel.clone();
    let worker_task = tokio::spawn(async move { worker.run(worker_cancel).await });

    let result = consumer.run(cancel.clone()).await;
    cancel.cancel();
    let stats = worker_task.await.context("job worker panicked")?;
    tracing::info!(completed = stats.completed, failed = stats.failed, "chainfeed stopped");

    result.context("consumer failed")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_block_accepts_hex_and_decimal() {
        assert_eq!(parse_block("0x41736a").unwrap(), PRODUCTION_ORIGIN_BLOCK);
        assert_eq!(parse_block("4289386").unwrap(), PRODUCTION_ORIGIN_BLOCK);
        assert!(parse_block("banana").is_err());
    }

    #[test]
    fn cli_overrides_config() {
        let cli = Cli::parse_from([
            "chainfeed",
            "--rpc-url",
            "https://rpc.example.org",
            "--log-level",
            "debug",
            "--json-logs",
            "discover",
        ]);
        let config = load_config(&cli).unwrap();
        assert_eq!(config.rpc_url, "https://rpc.example.org");
        assert_eq!(config.log.level.as_deref(), Some("debug"));
        assert!(config.log.json);
        assert!(matches!(cli.command, Some(Commands::Discover)));
    }
}
