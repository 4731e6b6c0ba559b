//! Output Monitor Binary Entry Point
//!
//! Runs the output monitor against a JSON snapshot file and prints the
//! resulting metrics in Prometheus text format on shutdown. Useful for
//! checking a configuration without a live pipeline host.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use output_monitor::{
    JsonFileIntrospector, MonitorConfig, OutputMonitor, config::parse_duration,
};
use prometheus::{Encoder, Registry, TextEncoder};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Output Monitor - output plugin status exporter
#[derive(Parser, Debug)]
#[command(name = "output-monitor", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (defaults apply when omitted)
    #[arg(short, long, env = "OUTPUT_MONITOR_CONFIG")]
    config: Option<PathBuf>,

    /// JSON file with the plugin snapshot list, re-read on every tick
    #[arg(short, long, env = "OUTPUT_MONITOR_SNAPSHOTS")]
    snapshots: PathBuf,

    /// Sampling interval (overrides config file)
    #[arg(long, env = "OUTPUT_MONITOR_INTERVAL", value_parser = parse_duration)]
    interval: Option<Duration>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,output_monitor=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            MonitorConfig::load(path)?
        }
        None => MonitorConfig::default(),
    };

    // CLI > ENV > config file
    if let Some(interval) = cli.interval {
        config.interval = interval;
    }

    let registry = Registry::new();
    let introspector = Arc::new(JsonFileIntrospector::new(&cli.snapshots));
    tracing::info!("Reading plugin snapshots from: {}", cli.snapshots.display());

    let mut monitor = OutputMonitor::configure(config, &registry, introspector)?;
    monitor.start()?;

    tracing::info!("Press Ctrl+C to shutdown");
    shutdown_signal().await;

    // Joining the scheduler thread blocks; keep it off the async workers.
    let result = tokio::task::spawn_blocking(move || monitor.shutdown()).await?;
    if let Err(e) = result {
        tracing::error!("Failed to shutdown monitor: {}", e);
    }

    let mut buffer = Vec::new();
    TextEncoder::new().encode(&registry.gather(), &mut buffer)?;
    print!("{}", String::from_utf8_lossy(&buffer));

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal");
        }
    }
}
