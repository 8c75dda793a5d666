//! spiderd — fleet reconnaissance and contract dispatch daemon.
//!
//! Runs two independent long-lived tasks against one shared environment:
//! - the fleet scan cycle (discover, classify, pool, schedule, detect)
//! - the contract dispatch consumer (drain port, solve, submit, bookkeep)
//!
//! Their only coordination is the contract port and the environment itself.

mod topology;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use spider_contracts::{DispatchConsumer, HttpSolver, PortRegistry};
use spider_core::config::load_dotenv;
use spider_core::{Config, Shutdown};
use spider_fleet::FleetCycle;
use spider_netenv::NetEnv;

/// Fleet reconnaissance / contract dispatch daemon.
#[derive(Parser, Debug)]
#[command(name = "spiderd", version, about)]
struct Cli {
    /// Path to the topology seed file.
    #[arg(long, env = "SPIDER_TOPOLOGY", default_value = "config/topology.json")]
    topology: PathBuf,

    /// Shutdown timeout in seconds.
    #[arg(long, env = "SPIDER_SHUTDOWN_TIMEOUT", default_value_t = 10)]
    shutdown_timeout: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    load_dotenv();
    let cli = Cli::parse();
    let config = Config::from_env();
    config.log_summary();

    let env: Arc<dyn NetEnv> = Arc::new(
        topology::load(&cli.topology).context("failed to load topology")?,
    );

    let ports = Arc::new(PortRegistry::new());
    ports.open(config.queue.port, config.queue.capacity);

    // Fatal misconfiguration (payload cost over the ceiling) surfaces here,
    // before anything is spawned.
    let cycle = FleetCycle::new(
        env.clone(),
        config.fleet.clone(),
        ports.clone(),
        config.queue.port,
    )
    .context("fleet startup check failed")?;

    let solver = HttpSolver::new(&config.solver);
    let consumer = DispatchConsumer::new(
        env.clone(),
        solver,
        ports.clone(),
        config.queue.port,
        &config.solver,
    );

    let shutdown = Shutdown::new();
    let scan_task = tokio::spawn(cycle.run(shutdown.clone()));
    let dispatch_task = tokio::spawn(consumer.run(shutdown.clone()));

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    info!("shutdown requested");
    shutdown.trigger();

    let drain = async {
        let _ = scan_task.await;
        let _ = dispatch_task.await;
    };
    if tokio::time::timeout(Duration::from_secs(cli.shutdown_timeout), drain)
        .await
        .is_err()
    {
        warn!("tasks did not stop within timeout, exiting anyway");
    }

    info!("spiderd stopped");
    Ok(())
}
