//! Process-wide logging setup
//!
//! Logging is an explicit collaborator: [`init`] installs the subscriber once
//! at process start and hands back a [`LogHandle`]. Dropping the handle flushes
//! the buffered file writer, so `main` keeps it alive until exit.

use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::error::{PipelineError, Result};

/// Default filter when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "mlproject=info";

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Directory receiving the log file
    pub log_dir: PathBuf,
    /// Log file name inside `log_dir`
    pub file_name: String,
    /// Filter used when `RUST_LOG` is not set
    pub default_filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("logs"),
            file_name: "running_logs.log".to_string(),
            default_filter: DEFAULT_FILTER.to_string(),
        }
    }
}

impl LoggingConfig {
    /// Use a different log directory
    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = dir.into();
        self
    }

    /// Full path of the log file
    pub fn log_file(&self) -> PathBuf {
        self.log_dir.join(&self.file_name)
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.default_filter))
    }
}

/// Keeps the non-blocking file writer alive; flushes on drop
#[must_use = "dropping the handle flushes and stops file logging"]
pub struct LogHandle {
    log_file: PathBuf,
    _guard: WorkerGuard,
}

impl LogHandle {
    /// Path of the file the pipeline logs into
    pub fn log_file(&self) -> &Path {
        &self.log_file
    }

    /// Flush pending records and stop file logging
    pub fn shutdown(self) {
        drop(self);
    }
}

/// Install the global subscriber: stderr plus a plain-text file layer.
///
/// Fails if a global subscriber is already installed.
pub fn init(config: &LoggingConfig) -> Result<LogHandle> {
    std::fs::create_dir_all(&config.log_dir)?;

    let file_appender = tracing_appender::rolling::never(&config.log_dir, &config.file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr)
        .with_filter(config.filter());

    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(non_blocking)
        .with_filter(config.filter());

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| PipelineError::ConfigError(format!("logging already initialised: {e}")))?;

    Ok(LogHandle {
        log_file: config.log_file(),
        _guard: guard,
    })
}
