//! Per-task logger with task-log, tracing and file output.
//!
//! Each task being produced gets its own logger that:
//! - Appends severity-tagged entries to the task's own log (through a sink)
//! - Mirrors every line to `tracing`
//! - Optionally writes a dedicated log file
//! - Filters progress lines to a configurable step

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use super::types::{LogConfig, LogEntry, LogSeverity, LogSink};

/// Per-task logger.
pub struct TaskLogger {
    /// Task id, used as the tracing field.
    task_id: String,
    /// Path to the per-task log file, if enabled.
    log_path: Option<PathBuf>,
    file_writer: Arc<Mutex<Option<BufWriter<File>>>>,
    /// Receives every entry destined for the task log.
    sink: Option<LogSink>,
    config: LogConfig,
    /// Last progress value logged (for step filtering).
    last_progress: Arc<Mutex<u32>>,
}

impl TaskLogger {
    /// Create a logger for one task.
    ///
    /// When `config.task_log_files` is set, entries are appended to a file
    /// named after `file_name` in `log_dir`, so retries extend the same log.
    pub fn new(
        task_id: impl Into<String>,
        file_name: &str,
        log_dir: impl AsRef<Path>,
        config: LogConfig,
        sink: Option<LogSink>,
    ) -> std::io::Result<Self> {
        let (log_path, writer) = if config.task_log_files {
            let log_dir = log_dir.as_ref();
            fs::create_dir_all(log_dir)?;
            let path = log_dir.join(format!("{}.log", sanitize_filename(file_name)));
            let file = OpenOptions::new().create(true).append(true).open(&path)?;
            (Some(path), Some(BufWriter::new(file)))
        } else {
            (None, None)
        };

        Ok(Self {
            task_id: task_id.into(),
            log_path,
            file_writer: Arc::new(Mutex::new(writer)),
            sink,
            config,
            last_progress: Arc::new(Mutex::new(0)),
        })
    }

    /// Logger that only mirrors to the sink and tracing.
    pub fn detached(task_id: impl Into<String>, sink: Option<LogSink>) -> Self {
        Self {
            task_id: task_id.into(),
            log_path: None,
            file_writer: Arc::new(Mutex::new(None)),
            sink,
            config: LogConfig::default(),
            last_progress: Arc::new(Mutex::new(0)),
        }
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Per-task log file path, if file output is enabled.
    pub fn log_path(&self) -> Option<&Path> {
        self.log_path.as_deref()
    }

    /// Record an entry in the task log.
    pub fn log(&self, severity: LogSeverity, message: &str) {
        match severity {
            LogSeverity::Info | LogSeverity::Success => {
                tracing::info!(task = %self.task_id, "{}", message)
            }
            LogSeverity::Warn => tracing::warn!(task = %self.task_id, "{}", message),
            LogSeverity::Error => tracing::error!(task = %self.task_id, "{}", message),
        }

        let entry = LogEntry::new(severity, message);
        self.write_line(&entry.format());
        if let Some(ref sink) = self.sink {
            sink(entry);
        }
    }

    pub fn info(&self, message: &str) {
        self.log(LogSeverity::Info, message);
    }

    pub fn success(&self, message: &str) {
        self.log(LogSeverity::Success, message);
    }

    pub fn warn(&self, message: &str) {
        self.log(LogSeverity::Warn, message);
    }

    pub fn error(&self, message: &str) {
        self.log(LogSeverity::Error, message);
    }

    /// Diagnostic line; never reaches the task log.
    pub fn debug(&self, message: &str) {
        tracing::debug!(task = %self.task_id, "{}", message);
        self.write_line(&format!("[DEBUG] {}", message));
    }

    /// Log progress update, filtered to `progress_step` intervals.
    ///
    /// Returns true if the progress was logged, false if filtered.
    pub fn progress(&self, percent: u32) -> bool {
        let step = self.config.progress_step.max(1);
        {
            let mut last = self.last_progress.lock();
            let current_step = (percent / step) * step;
            let last_step = (*last / step) * step;

            if current_step <= last_step && percent < 100 {
                return false;
            }
            *last = percent;
        }

        tracing::debug!(task = %self.task_id, percent, "progress");
        self.write_line(&format!("Progress: {}%", percent));
        true
    }

    /// Flush the log file.
    pub fn flush(&self) {
        if let Some(ref mut writer) = *self.file_writer.lock() {
            let _ = writer.flush();
        }
    }

    /// Close the logger and release the file.
    pub fn close(&self) {
        self.flush();
        *self.file_writer.lock() = None;
    }

    fn write_line(&self, line: &str) {
        if let Some(ref mut writer) = *self.file_writer.lock() {
            let _ = writeln!(writer, "{}", line);
        }
    }
}

impl Drop for TaskLogger {
    fn drop(&mut self) {
        self.close();
    }
}

/// Sanitize a string to be safe for use as a filename.
fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            _ => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn collecting_sink() -> (LogSink, Arc<Mutex<Vec<LogEntry>>>) {
        let entries = Arc::new(Mutex::new(Vec::new()));
        let clone = entries.clone();
        let sink: LogSink = Arc::new(move |entry| clone.lock().push(entry));
        (sink, entries)
    }

    #[test]
    fn entries_reach_sink_in_order() {
        let (sink, entries) = collecting_sink();
        let logger = TaskLogger::detached("t1", Some(sink));

        logger.info("Claimed");
        logger.warn("Drive upload failed");
        logger.debug("not in task log");

        let entries = entries.lock();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].severity, LogSeverity::Info);
        assert_eq!(entries[1].severity, LogSeverity::Warn);
        assert_eq!(entries[1].message, "Drive upload failed");
    }

    #[test]
    fn writes_task_log_file_when_enabled() {
        let dir = tempdir().unwrap();
        let config = LogConfig {
            task_log_files: true,
            ..LogConfig::default()
        };
        let logger = TaskLogger::new("t1", "Prod_1.mp3", dir.path(), config, None).unwrap();

        logger.success("Done");
        logger.flush();

        let path = logger.log_path().unwrap().to_path_buf();
        assert!(path.ends_with("Prod_1.mp3.log"));
        let content = fs::read_to_string(path).unwrap();
        assert!(content.contains("[SUCCESS]"));
        assert!(content.contains("Done"));
    }

    #[test]
    fn second_attempt_appends_to_log_file() {
        let dir = tempdir().unwrap();
        let config = LogConfig {
            task_log_files: true,
            ..LogConfig::default()
        };
        let first = TaskLogger::new("t1", "Prod_1.mp3", dir.path(), config.clone(), None).unwrap();
        first.error("Synthesis rejected");
        first.close();

        let second = TaskLogger::new("t1", "Prod_1.mp3", dir.path(), config, None).unwrap();
        second.success("Done");
        second.close();

        let content = fs::read_to_string(dir.path().join("Prod_1.mp3.log")).unwrap();
        assert!(content.contains("Synthesis rejected"));
        assert!(content.contains("Done"));
    }

    #[test]
    fn no_file_without_flag() {
        let dir = tempdir().unwrap();
        let logger = TaskLogger::new("t1", "a.mp3", dir.path(), LogConfig::default(), None).unwrap();
        assert!(logger.log_path().is_none());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn progress_is_filtered_to_step() {
        let logger = TaskLogger::detached("t1", None);

        assert!(!logger.progress(5));
        assert!(!logger.progress(15));
        assert!(logger.progress(20));
        assert!(!logger.progress(25));
        assert!(logger.progress(40));
        assert!(logger.progress(100));
    }

    #[test]
    fn sanitizes_filename() {
        assert_eq!(sanitize_filename("normal_name"), "normal_name");
        assert_eq!(sanitize_filename("has/slash"), "has_slash");
        assert_eq!(sanitize_filename("a<b>c"), "a_b_c");
    }
}
