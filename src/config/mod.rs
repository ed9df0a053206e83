//! Configuration management for the FRITZ!Box monitor
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! environment variables of the form `FRITZBOX__ROUTER__HOST`.

use crate::error::{FritzboxError, Result};
use crate::statistics::DEFAULT_SOAP_PORT;
use crate::transport::TransportConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "FRITZBOX";

/// Default call monitor port
pub const DEFAULT_CALL_MONITOR_PORT: u16 = 1012;

/// Monitor configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MonitorConfig {
    /// Router connection settings
    pub router: RouterConfig,

    /// Session cadence settings
    pub session: SessionConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Router connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Router host name or IP address
    pub host: String,

    /// Call monitor TCP port, 0 disables the call monitor
    pub call_monitor_port: u16,

    /// UPnP control port used for statistics
    pub soap_port: u16,

    /// Timeout for a statistics request
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Timeout for a call monitor connection attempt
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            host: "fritz.box".to_string(),
            call_monitor_port: DEFAULT_CALL_MONITOR_PORT,
            soap_port: DEFAULT_SOAP_PORT,
            request_timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

impl RouterConfig {
    /// Whether the call monitor socket should be used
    pub fn call_monitor_enabled(&self) -> bool {
        self.call_monitor_port != 0
    }
}

/// Session cadence settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Period of one scheduler tick
    #[serde(with = "humantime_serde")]
    pub tick_interval: Duration,

    /// Ticks between statistics polls
    pub statistics_interval_ticks: u32,

    /// Ticks between heartbeat updates
    pub heartbeat_interval_ticks: u32,

    /// Delay before the call monitor reconnects
    #[serde(with = "humantime_serde")]
    pub retry_delay: Duration,

    /// Call monitor line buffer size in bytes
    pub line_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            statistics_interval_ticks: 10,
            heartbeat_interval_ticks: 12,
            retry_delay: Duration::from_secs(30),
            line_capacity: crate::callmonitor::DEFAULT_LINE_CAPACITY,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,

    /// Log file path, rotated daily
    pub file_path: Option<PathBuf>,

    /// Emit JSON formatted logs
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_path: None,
            json: false,
        }
    }
}

impl MonitorConfig {
    /// Load configuration from defaults, an optional file and the environment
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut builder =
            config::Config::builder().add_source(config::Config::try_from(&Self::default())?);

        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let config: Self = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Statistics-only configuration for a router
    pub fn for_router(host: impl Into<String>, call_monitor_port: u16) -> Self {
        let mut config = Self::default();
        config.router.host = host.into();
        config.router.call_monitor_port = call_monitor_port;
        config
    }

    /// Check values that would make the session misbehave
    pub fn validate(&self) -> Result<()> {
        if self.router.host.trim().is_empty() {
            return Err(FritzboxError::config("router.host must not be empty"));
        }
        if self.router.soap_port == 0 {
            return Err(FritzboxError::config("router.soap_port must not be 0"));
        }
        if self.session.tick_interval.is_zero() {
            return Err(FritzboxError::config("session.tick_interval must be positive"));
        }
        if self.session.statistics_interval_ticks == 0 {
            return Err(FritzboxError::config(
                "session.statistics_interval_ticks must be positive",
            ));
        }
        if self.session.heartbeat_interval_ticks == 0 {
            return Err(FritzboxError::config(
                "session.heartbeat_interval_ticks must be positive",
            ));
        }
        if self.session.line_capacity < 2 {
            return Err(FritzboxError::config(
                "session.line_capacity must be at least 2",
            ));
        }
        Ok(())
    }

    /// Transport settings for the call monitor socket
    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            host: self.router.host.clone(),
            port: self.router.call_monitor_port,
            connect_timeout: self.router.connect_timeout,
            retry_delay: self.session.retry_delay,
            read_buffer_size: self.session.line_capacity,
        }
    }
}
