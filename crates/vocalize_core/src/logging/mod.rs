//! Logging infrastructure for the production studio.
//!
//! This module provides:
//! - Per-task loggers feeding the task's own append-only log
//! - Progress filtering to a configurable step
//! - Process-wide `tracing` setup, optionally with a rolling log file
//!
//! # Example
//!
//! ```no_run
//! use vocalize_core::logging::{TaskLogger, LogConfig};
//!
//! let logger = TaskLogger::new("task-id", "Prod_1.mp3", "/path/to/logs", LogConfig::default(), None)
//!     .unwrap();
//! logger.info("Synthesizing");
//! logger.progress(50);
//! logger.success("Production complete");
//! ```

mod task_logger;
mod types;

pub use task_logger::TaskLogger;
pub use types::{LogConfig, LogEntry, LogLevel, LogSeverity, LogSink};

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize global tracing subscriber for application-wide logging.
///
/// `RUST_LOG` overrides `default_level`. Output goes to stderr.
/// Should be called once at application startup.
pub fn init_tracing(default_level: LogLevel) {
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(false))
        .with(env_filter(default_level))
        .init();
}

/// Initialize tracing with an additional daily rolling file in `log_dir`.
///
/// The returned guard must be kept alive for the file writer to flush.
pub fn init_tracing_with_file(default_level: LogLevel, log_dir: impl AsRef<Path>) -> WorkerGuard {
    let appender = tracing_appender::rolling::daily(log_dir.as_ref(), "vocalize.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(false))
        .with(fmt::layer().with_ansi(false).with_writer(writer))
        .with(env_filter(default_level))
        .init();

    guard
}

/// Initialize tracing for tests (only logs warnings and above).
#[cfg(test)]
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();
}

fn env_filter(default_level: LogLevel) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_to_filter_str(default_level)))
}

/// Convert LogLevel to filter string.
fn level_to_filter_str(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Trace => "trace",
        LogLevel::Debug => "debug",
        LogLevel::Info => "info",
        LogLevel::Warn => "warn",
        LogLevel::Error => "error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_to_filter_works() {
        assert_eq!(level_to_filter_str(LogLevel::Debug), "debug");
        assert_eq!(level_to_filter_str(LogLevel::Warn), "warn");
    }
}
