//! Logging types and configuration.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

/// Log level for filtering process-wide output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace-level debugging (very verbose).
    Trace,
    /// Debug information.
    Debug,
    /// General information.
    #[default]
    Info,
    /// Warnings.
    Warn,
    /// Errors.
    Error,
}

impl LogLevel {
    /// Convert to tracing level.
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Severity of an entry in a task's own log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogSeverity {
    Info,
    Success,
    Warn,
    Error,
}

impl LogSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogSeverity::Info => "INFO",
            LogSeverity::Success => "SUCCESS",
            LogSeverity::Warn => "WARN",
            LogSeverity::Error => "ERROR",
        }
    }
}

/// One timestamped line in a task's append-only log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub at: DateTime<Utc>,
    pub severity: LogSeverity,
    pub message: String,
}

impl LogEntry {
    pub fn new(severity: LogSeverity, message: impl Into<String>) -> Self {
        Self {
            at: Utc::now(),
            severity,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(LogSeverity::Info, message)
    }

    /// Render as `[SEVERITY] [HH:MM:SS] message` in local time.
    pub fn format(&self) -> String {
        let time = self.at.with_timezone(&Local).format("%H:%M:%S");
        format!("[{}] [{}] {}", self.severity.as_str(), time, self.message)
    }
}

/// Configuration for per-task logging behavior.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Write each task's log to `<logs_folder>/<file_name>.log`.
    pub task_log_files: bool,
    /// Progress update step percentage (only trace progress at these intervals).
    pub progress_step: u32,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            task_log_files: false,
            progress_step: 20,
        }
    }
}

/// Callback receiving every entry a task logger records.
pub type LogSink = std::sync::Arc<dyn Fn(LogEntry) + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_format_carries_severity_tag() {
        let entry = LogEntry::new(LogSeverity::Warn, "Drive upload interrupted");
        let line = entry.format();
        assert!(line.starts_with("[WARN] ["));
        assert!(line.ends_with("Drive upload interrupted"));
    }

    #[test]
    fn levels_are_ordered() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Warn < LogLevel::Error);
        assert_eq!(LogLevel::Warn.to_tracing_level(), tracing::Level::WARN);
    }
}
