//! OUTRIDER - Vehicle Telemetry Alerting Daemon
//!
//! Watches a fleet's realtime vehicle data and dispatches chat and push
//! notifications for geofence breaches, driver drowsiness, cabin intruders,
//! and accidents.
//!
//! ## Usage
//!
//! ```bash
//! # Start the daemon with the default config (~/.outrider/config.yaml)
//! outrider
//!
//! # With an explicit config file
//! outrider --config /etc/outrider/config.yaml
//!
//! # With verbose logging
//! outrider -v
//!
//! # With custom log directory
//! outrider --log-dir /path/to/logs/
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use outrider_alerts::AlertService;
use outrider_core::config::{default_config_path, Config};
use outrider_core::{init_logging, LogGuard};
use outrider_dispatch::{create_push, create_queue, Dispatcher};
use outrider_store::create_store;

/// OUTRIDER vehicle alerting daemon
///
/// Listens to realtime vehicle telemetry and notifies vehicle owners over
/// chat and push when an alert rule fires.
#[derive(Parser, Debug)]
#[command(name = "outrider")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (defaults to ~/.outrider/config.yaml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging (increases log level)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Directory for log files (defaults to ~/.outrider/logs/)
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let _guard = match setup_logging(&cli) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            return ExitCode::from(1);
        }
    };

    info!("Starting outrider");

    match run_daemon(&cli).await {
        Ok(()) => {
            info!("outrider exited normally");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("outrider error: {}", e);
            eprintln!("Error: {}", e);
            ExitCode::from(1)
        }
    }
}

/// Set up logging based on CLI arguments.
fn setup_logging(cli: &Cli) -> outrider_core::Result<LogGuard> {
    // verbose flag increases log level
    let debug = cli.verbose > 0;
    init_logging(cli.log_dir.clone(), debug)
}

/// Load configuration, wire the backends, and run until ctrl-c.
async fn run_daemon(cli: &Cli) -> anyhow::Result<()> {
    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => default_config_path()?,
    };
    let config = Config::load(&config_path)?;
    info!(path = %config_path.display(), "configuration loaded");

    let store = create_store(&config.store)?;
    let queue = create_queue(&config.queue)?;
    let push = create_push(&config.push)?;
    let dispatcher = Arc::new(Dispatcher::new(store.clone(), queue, push));

    let mut service = AlertService::start(&config, store, dispatcher).await?;
    info!("listening for vehicle changes");

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");
    service.shutdown();
    Ok(())
}
