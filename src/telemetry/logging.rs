//! Logging configuration and initialization
//!
//! Structured logging with tracing: compact console output for development,
//! JSON for log aggregation, and an optional non-blocking file sink.

use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Enable console output (default: true)
    pub console_enabled: bool,
    /// Enable file logging (default: false)
    pub file_enabled: bool,
    /// Path for the log file (default: `lightfield_viewer.log` in the working directory)
    pub file_path: Option<PathBuf>,
    /// Use JSON format for console logs (default: false)
    pub json_format: bool,
    /// Default log level filter (default: "info")
    pub default_level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            console_enabled: true,
            file_enabled: false,
            file_path: None,
            json_format: false,
            default_level: "info".to_string(),
        }
    }
}

impl LogConfig {
    /// Build the filter, checking `LIGHTFIELD_LOG`, then `RUST_LOG`, then the configured default
    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_env("LIGHTFIELD_LOG")
            .or_else(|_| EnvFilter::try_from_env("RUST_LOG"))
            .unwrap_or_else(|_| EnvFilter::new(&self.default_level))
    }

    /// Whether JSON output is requested, via `LIGHTFIELD_LOG_FORMAT=json` or the config
    fn use_json(&self) -> bool {
        std::env::var("LIGHTFIELD_LOG_FORMAT")
            .map(|v| v.eq_ignore_ascii_case("json"))
            .unwrap_or(self.json_format)
    }
}

/// Initialize the logging system with the given configuration
///
/// Returns a guard that must be kept alive for the duration of the program
/// so the file sink is flushed on exit.
///
/// # Environment Variables
///
/// - `LIGHTFIELD_LOG`: log level filter (e.g., "debug", "info,lightfield_viewer=trace")
/// - `LIGHTFIELD_LOG_FORMAT`: set to "json" for JSON output
pub fn init_logging(
    config: &LogConfig,
) -> Result<Option<WorkerGuard>, Box<dyn std::error::Error + Send + Sync>> {
    let use_json = config.use_json();
    let subscriber = tracing_subscriber::registry().with(config.env_filter());
    let mut file_guard: Option<WorkerGuard> = None;

    if config.file_enabled {
        let log_path = config
            .file_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("lightfield_viewer.log"));
        let file = std::fs::File::create(&log_path)?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        file_guard = Some(guard);

        let file_layer = fmt::layer()
            .with_writer(non_blocking)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(false);

        if config.console_enabled {
            let console_layer = fmt::layer().with_target(true).compact();
            subscriber.with(file_layer).with(console_layer).try_init()?;
        } else {
            subscriber.with(file_layer).try_init()?;
        }

        eprintln!("Logging to file: {}", log_path.display());
    } else if config.console_enabled {
        if use_json {
            let json_layer = fmt::layer()
                .json()
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true);
            subscriber.with(json_layer).try_init()?;
        } else {
            let console_layer = fmt::layer().with_target(true).compact();
            subscriber.with(console_layer).try_init()?;
        }
    } else {
        subscriber.try_init()?;
    }

    tracing::info!(
        target: "lightfield_viewer",
        version = env!("CARGO_PKG_VERSION"),
        json_format = use_json,
        file_enabled = config.file_enabled,
        "Logging initialized"
    );

    Ok(file_guard)
}

// Re-export WorkerGuard so callers can store it
pub use tracing_appender::non_blocking::WorkerGuard as LogGuard;
