//! One-shot traffic statistics query
//!
//! Polls the router once, prints the snapshot as JSON and exits non-zero
//! when the router could not be queried.

use clap::Parser;
use fritzbox_monitor::{
    error::ErrorReporter,
    logging::{init_logging, LogConfig},
    statistics::SoapClient,
    FritzboxError, InMemoryHub, MonitorConfig, Result, StatisticsPoller,
};
use std::path::PathBuf;
use std::sync::Arc;

/// Print FRITZ!Box WAN traffic statistics
#[derive(Parser, Debug)]
#[command(name = "fritzbox-stats")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, env = "FRITZBOX_CONFIG")]
    config: Option<PathBuf>,

    /// Router host, overrides the configuration file
    #[arg(long, env = "FRITZBOX_HOST")]
    host: Option<String>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = MonitorConfig::load(cli.config.as_deref())?;
    if let Some(host) = cli.host {
        config.router.host = host;
    }
    config.validate()?;

    init_logging(LogConfig::from_settings(&config.logging).with_debug(cli.debug))
        .map_err(|e| FritzboxError::config(format!("Failed to initialize logging: {e}")))?;

    let router = &config.router;
    let soap = SoapClient::new(&router.host, router.soap_port, router.request_timeout)?;
    let poller = StatisticsPoller::new(soap, Arc::new(InMemoryHub::new()), router.host.clone());

    let statistics = poller.poll().await.map_err(|e| {
        ErrorReporter::log_error(&e, "statistics", "poll");
        e
    })?;
    let snapshot = serde_json::json!({
        "host": router.host,
        "bytes_sent_mb": statistics.counters.sent_mb(),
        "bytes_received_mb": statistics.counters.received_mb(),
        "tx_mbps": statistics.rates.send_mbps(),
        "rx_mbps": statistics.rates.receive_mbps(),
    });
    println!("{}", serde_json::to_string_pretty(&snapshot)?);

    Ok(())
}
