//! Logging setup with optional daily-rotated log file
//!
//! Output goes to stderr, a file, or both. `RUST_LOG` directives always
//! take precedence over the configured default level.

use crate::config::LoggingConfig;
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Layer, Registry};

const DEFAULT_LOG_FILE_NAME: &str = "fritzbox-monitor.log";

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Default log level
    pub level: Level,

    /// Log to file
    pub file_path: Option<PathBuf>,

    /// Log to stderr
    pub stderr: bool,

    /// JSON formatted events
    pub json: bool,

    /// Include thread IDs
    pub thread_ids: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            file_path: None,
            stderr: true,
            json: false,
            thread_ids: false,
        }
    }
}

impl LogConfig {
    /// Create config from the `[logging]` settings, then apply the environment
    pub fn from_settings(settings: &LoggingConfig) -> Self {
        let config = Self {
            level: parse_level(&settings.level).unwrap_or(Level::INFO),
            file_path: settings.file_path.clone(),
            json: settings.json,
            ..Self::default()
        };
        config.with_env_overrides()
    }

    /// Force debug level
    pub fn with_debug(mut self, debug: bool) -> Self {
        if debug && self.level < Level::DEBUG {
            self.level = Level::DEBUG;
        }
        self
    }

    fn with_env_overrides(mut self) -> Self {
        if let Some(level) = std::env::var("RUST_LOG").ok().as_deref().and_then(parse_level) {
            self.level = level;
        }

        if let Ok(log_file) = std::env::var("FRITZBOX_LOG_FILE") {
            self.file_path = Some(PathBuf::from(log_file));
        }

        if let Ok(log_stderr) = std::env::var("FRITZBOX_LOG_STDERR") {
            self.stderr = log_stderr.to_lowercase() != "false";
        }

        self
    }
}

/// Most verbose level mentioned in a level name or filter directive
fn parse_level(value: &str) -> Option<Level> {
    let value = value.to_lowercase();
    if value.contains("trace") {
        Some(Level::TRACE)
    } else if value.contains("debug") {
        Some(Level::DEBUG)
    } else if value.contains("info") {
        Some(Level::INFO)
    } else if value.contains("warn") {
        Some(Level::WARN)
    } else if value.contains("error") {
        Some(Level::ERROR)
    } else {
        None
    }
}

fn output_layer<W>(
    writer: W,
    ansi: bool,
    config: &LogConfig,
) -> Box<dyn Layer<Registry> + Send + Sync>
where
    W: for<'w> fmt::MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = fmt::layer()
        .with_writer(writer)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(config.thread_ids);

    if config.json {
        layer.json().boxed()
    } else {
        layer.with_ansi(ansi).boxed()
    }
}

/// Initialize the global subscriber
pub fn init_logging(
    config: LogConfig,
) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(config.level.into())
        .from_env_lossy();

    let mut layers = Vec::new();

    if config.stderr {
        layers.push(output_layer(std::io::stderr, true, &config));
    }

    if let Some(file_path) = &config.file_path {
        let directory = file_path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(directory)?;

        let file_name = file_path
            .file_name()
            .unwrap_or_else(|| std::ffi::OsStr::new(DEFAULT_LOG_FILE_NAME));
        let file_appender = tracing_appender::rolling::daily(directory, file_name);
        layers.push(output_layer(file_appender, false, &config));
    }

    let subscriber = tracing_subscriber::registry().with(layers).with(env_filter);
    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}
