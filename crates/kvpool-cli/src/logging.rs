//! Logging setup for the `kvpool` binary
//!
//! Console output goes to stderr so that tables and replies on stdout stay
//! clean. `RUST_LOG` overrides the default filter. An optional log directory
//! adds a daily rolling JSON file.

use std::path::PathBuf;

use clap::ValueEnum;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

const QUIET_FILTER: &str =
    "warn,kvpool=info,kvpool_core=info,kvpool_connection=info,kvpool_driver_redis=info";
const VERBOSE_FILTER: &str =
    "info,kvpool=debug,kvpool_core=debug,kvpool_connection=debug,kvpool_driver_redis=debug";

/// Console log format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human readable, colored when attached to a terminal
    Pretty,
    /// One JSON object per line
    Json,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Console format
    pub format: LogFormat,

    /// Directory for rolling JSON log files; `None` disables file output
    pub log_dir: Option<PathBuf>,

    /// Whether to include file/line information in console logs
    pub include_location: bool,

    /// Whether to log span open/close events
    pub enable_spans: bool,

    /// Filter used when `RUST_LOG` is not set
    pub default_filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            log_dir: None,
            include_location: false,
            enable_spans: false,
            default_filter: QUIET_FILTER.to_string(),
        }
    }
}

impl LoggingConfig {
    /// Verbose configuration with location info and span events
    pub fn verbose() -> Self {
        Self {
            include_location: true,
            enable_spans: true,
            default_filter: VERBOSE_FILTER.to_string(),
            ..Self::default()
        }
    }

    /// Set the console format
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Also write JSON logs to a daily rolling file in `dir`
    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }
}

/// Default directory for file logs
pub fn log_directory() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("kvpool")
        .join("logs")
}

/// Install the global subscriber
///
/// The returned guard flushes the file writer when dropped; keep it alive
/// until the program exits.
pub fn init(config: &LoggingConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    // NEW/CLOSE only; ENTER would repeat on every poll of an instrumented future.
    let span_events = if config.enable_spans {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let mut layers = Vec::new();

    let console_layer = match config.format {
        LogFormat::Pretty => fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_span_events(span_events.clone())
            .with_filter(env_filter.clone())
            .boxed(),
        LogFormat::Json => fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_span_events(span_events.clone())
            .with_ansi(false)
            .json()
            .with_current_span(true)
            .with_filter(env_filter.clone())
            .boxed(),
    };
    layers.push(console_layer);

    let mut guard = None;
    if let Some(log_dir) = &config.log_dir {
        std::fs::create_dir_all(log_dir)?;

        let file_appender = tracing_appender::rolling::daily(log_dir, "kvpool.log");
        let (non_blocking, worker_guard) = tracing_appender::non_blocking(file_appender);
        guard = Some(worker_guard);

        let json_layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .with_span_events(span_events)
            .with_ansi(false)
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_writer(non_blocking)
            .with_filter(env_filter)
            .boxed();
        layers.push(json_layer);
    }

    tracing_subscriber::registry().with(layers).try_init()?;

    tracing::debug!(
        format = ?config.format,
        log_dir = ?config.log_dir,
        "logging initialized"
    );

    Ok(guard)
}
