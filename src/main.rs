//! AIS Tracker CLI - Ingest decoded AIS feeds and keep a live vessel directory.

use ais_tracker::{
    config::{Config, channel_key},
    metrics::{ChannelProbe, MetricsSource, start_metrics_server},
    registry::ChannelRegistry,
};
use anyhow::{Result, bail};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// AIS Tracker - Ingest decoded AIS feeds and keep a live vessel directory
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the config file (default: platform config dir)
    #[arg(short, long, env = "AIS_TRACKER_CONFIG")]
    config: Option<PathBuf>,

    /// Run a single channel against this host, in addition to configured ones
    #[arg(long, env = "AIS_HOST")]
    host: Option<String>,

    /// Port for the --host channel
    #[arg(long, env = "AIS_PORT", default_value_t = ais_tracker::config::DEFAULT_PORT)]
    port: u16,

    /// Serve Prometheus metrics on this port (overrides config)
    #[arg(long)]
    metrics_port: Option<u16>,

    /// Print each vessel movement (verbose)
    #[arg(short, long)]
    verbose: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Maximum runtime in seconds (0 = unlimited)
    #[arg(long, default_value_t = 0)]
    max_runtime: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!("AIS Tracker starting...");

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(host) = &args.host {
        let ident = "cli".to_string();
        config.properties.set_property(channel_key(&ident, "host"), host);
        config.properties.set_property(channel_key(&ident, "port"), args.port);
        config.channels.push(ident);
    }
    if let Some(port) = args.metrics_port {
        config.metrics_enabled = true;
        config.metrics_port = port;
    }
    config.validate()?;

    if config.channels.is_empty() {
        bail!(
            "No channels configured; add `channels` to {} or pass --host",
            Config::config_path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "the config file".to_string())
        );
    }

    let mut registry = ChannelRegistry::from_config(&config);

    // Create shutdown signal
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

    // Handle Ctrl+C
    let shutdown_tx_clone = shutdown_tx.clone();
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received"),
            Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
        }
        let _ = shutdown_tx_clone.send(true);
    });

    // Optional max runtime
    if args.max_runtime > 0 {
        let max_runtime = Duration::from_secs(args.max_runtime);
        let shutdown_tx_clone = shutdown_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(max_runtime).await;
            info!("Max runtime reached");
            let _ = shutdown_tx_clone.send(true);
        });
    }

    // Start metrics server
    if config.metrics_enabled {
        let source = Arc::new(MetricsSource::new(
            Arc::clone(registry.directory()),
            registry.channels().iter().map(ChannelProbe::from).collect(),
        ));
        let port = config.metrics_port;
        tokio::spawn(async move {
            if let Err(e) = start_metrics_server(port, source).await {
                error!("Metrics server failed: {}", e);
            }
        });
    }

    // Print vessel movements
    if args.verbose {
        let mut moves = registry.directory().subscribe();
        tokio::spawn(async move {
            loop {
                match moves.recv().await {
                    Ok(m) => println!(
                        "MMSI:{} {} -> {}",
                        m.mmsi,
                        m.previous
                            .map(|p| p.to_string())
                            .unwrap_or_else(|| "-".to_string()),
                        m.current
                    ),
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        debug!("Skipped {} movement notifications", n);
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }

    if registry.activate_all().await == 0 {
        warn!("No AIS channel could be started");
    }

    // Wait for shutdown
    while !*shutdown_rx.borrow() {
        if shutdown_rx.changed().await.is_err() {
            break;
        }
    }

    registry.deactivate_all().await;

    // Print final summary
    println!("\n\nFINAL STATISTICS");
    for status in registry.statuses() {
        println!(
            "{} ({}): {} messages, {} new vessels",
            status.ident, status.short_descr, status.messages, status.vessels
        );
    }
    println!("Vessels tracked: {}", registry.directory().len());

    Ok(())
}
