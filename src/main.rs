//! FRITZ!Box monitor - Main Entry Point
//!
//! Runs a router session against the in-memory hub until interrupted.

use clap::Parser;
use fritzbox_monitor::{
    error::ErrorReporter,
    logging::{init_logging, LogConfig},
    FritzboxError, InMemoryHub, MonitorConfig, Result, RouterSession,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

const STATE_SYNC_PERIOD: Duration = Duration::from_secs(60);

/// FRITZ!Box call monitor and traffic statistics
#[derive(Parser, Debug)]
#[command(name = "fritzbox-monitor")]
#[command(about = "Publish FRITZ!Box call events and WAN statistics to a hub")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, env = "FRITZBOX_CONFIG")]
    config: Option<PathBuf>,

    /// Router host, overrides the configuration file
    #[arg(long, env = "FRITZBOX_HOST")]
    host: Option<String>,

    /// Call monitor port, 0 disables the call monitor
    #[arg(short, long)]
    port: Option<u16>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Log file, rotated daily
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Persist hub state to this JSON file
    #[arg(long, env = "FRITZBOX_STATE_FILE")]
    state_file: Option<PathBuf>,
}

impl Cli {
    /// Load the configuration and apply command line overrides
    fn load_config(&self) -> Result<MonitorConfig> {
        let mut config = MonitorConfig::load(self.config.as_deref())?;

        if let Some(host) = &self.host {
            config.router.host = host.clone();
        }
        if let Some(port) = self.port {
            config.router.call_monitor_port = port;
        }
        if let Some(log_file) = &self.log_file {
            config.logging.file_path = Some(log_file.clone());
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config()?;

    init_logging(LogConfig::from_settings(&config.logging).with_debug(cli.debug))
        .map_err(|e| FritzboxError::config(format!("Failed to initialize logging: {e}")))?;

    info!(
        "Starting FRITZ!Box monitor v{} for {}",
        env!("CARGO_PKG_VERSION"),
        config.router.host
    );

    let hub = match &cli.state_file {
        Some(path) => InMemoryHub::with_state_file(path),
        None => InMemoryHub::new(),
    };
    if let Err(e) = hub.load().await {
        ErrorReporter::log_error(&e, "hub", "load");
        warn!("Starting with empty hub state");
    }
    let sync_cancel = CancellationToken::new();
    let sync = hub.start_periodic_sync(STATE_SYNC_PERIOD, sync_cancel.clone());

    let hub = Arc::new(hub);
    let mut session = RouterSession::new(config, hub.clone(), hub.clone());
    session.start()?;

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");

    session.stop().await;

    sync_cancel.cancel();
    if let Some(sync) = sync {
        if let Err(e) = sync.await {
            warn!("Hub state sync ended abnormally: {}", e);
        }
    }
    if let Err(e) = hub.persist().await {
        ErrorReporter::log_error(&e, "hub", "persist");
        return Err(e);
    }

    Ok(())
}
