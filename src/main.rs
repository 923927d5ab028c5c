//! leftbehind - forgotten-item alert solver
//!
//! Watches the mobility of a group of required items and a set of door
//! sensors in a world-model data service. When a door opens while any item
//! has not moved recently, it publishes an alert attribute for that item.
//!
//! Module structure:
//! - `domain/` - Core types (MobilityState, sensor events, timestamps)
//! - `io/` - External interfaces (world-model wire client, codec, alert sink)
//! - `services/` - Solver logic (DecisionEngine, poll/dispatch loop)
//! - `infra/` - Infrastructure (Config, runtime stats)

use clap::Parser;
use leftbehind::infra::{Config, SolverStats};
use leftbehind::io::{ConsoleAlertSink, WorldModelAlertSink, WorldModelPublisher};
use leftbehind::services::Solver;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// leftbehind - forgotten-item alert solver
#[derive(Parser, Debug)]
#[command(name = "leftbehind", version, about)]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "config/dev.toml")]
    config: String,

    /// Print alerts to the console instead of publishing to the world model
    #[arg(long)]
    console: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured logging with configurable level via RUST_LOG env var
    // Default: INFO, use RUST_LOG=debug for full event visibility
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), git = env!("GIT_HASH"), "leftbehind starting");

    let args = Args::parse();

    // An unreadable config or an empty watch set refuses to start
    let config = Config::from_file(&args.config)?;

    info!(
        config_file = %config.config_file(),
        world_model = %format!("{}:{}/{}", config.host(), config.client_port(), config.solver_port()),
        required_items = ?config.required_items(),
        doors = ?config.doors(),
        delay_tolerance_secs = config.delay_tolerance_secs(),
        alert_attribute = %config.alert_attribute(),
        origin = %config.origin(),
        console = args.console,
        "config_loaded"
    );

    // Create shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Handle shutdown on Ctrl+C
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("shutdown_signal_received");
        let _ = shutdown_tx.send(true);
    });

    let stats = Arc::new(SolverStats::new());

    // Periodic stats reporter
    let reporter_stats = stats.clone();
    let stats_interval = config.stats_interval_secs();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(stats_interval));
        interval.tick().await; // first tick fires immediately, skip it
        loop {
            interval.tick().await;
            reporter_stats.log_summary();
        }
    });

    if args.console {
        let sink = ConsoleAlertSink::new(config.required_items());
        let mut solver = Solver::new(config, sink, stats);
        solver.run(shutdown_rx).await;
    } else {
        let mut publisher = WorldModelPublisher::new(&config);
        // Registration is replayed on reconnect; a world model that is down
        // at startup is a warning, not an error
        if let Err(e) = publisher.connect().await {
            warn!(error = %e, "publisher_connect_failed_at_startup");
        }
        if let Err(e) = publisher.set_origin(config.origin()).await {
            warn!(error = %e, "set_origin_failed");
        }
        if let Err(e) = publisher.declare_attribute(config.alert_attribute(), true).await {
            warn!(error = %e, "declare_attribute_failed");
        }

        let sink = WorldModelAlertSink::new(
            publisher,
            config.alert_attribute(),
            config.required_items(),
            stats.clone(),
        );
        let mut solver = Solver::new(config, sink, stats);
        solver.run(shutdown_rx).await;
        solver.sink_mut().disconnect().await;
    }

    info!("leftbehind shutdown complete");
    Ok(())
}
