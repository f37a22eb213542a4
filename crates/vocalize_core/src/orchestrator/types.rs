//! Core types for the production pipeline.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::logging::TaskLogger;
use crate::models::{ArtifactLocators, Destination, Task, UploadStatus};

use super::collaborators::ProcessedAudio;

/// Progress callback: (percent, optional new ETA in seconds).
pub type ProgressCallback = Box<dyn Fn(u8, Option<u32>) + Send + Sync>;

/// Upload status callback for remote destinations.
pub type UploadCallback = Box<dyn Fn(Destination, UploadStatus) + Send + Sync>;

/// Read-only context passed to pipeline steps.
///
/// Holds the claimed task snapshot and the reporting channels. Mutable
/// results go in `ProductionState`.
pub struct ProductionContext {
    /// Task as it was when claimed.
    pub task: Task,
    pub logger: Arc<TaskLogger>,
    progress_callback: Option<ProgressCallback>,
    upload_callback: Option<UploadCallback>,
}

impl ProductionContext {
    pub fn new(task: Task, logger: Arc<TaskLogger>) -> Self {
        Self {
            task,
            logger,
            progress_callback: None,
            upload_callback: None,
        }
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn with_upload_callback(mut self, callback: UploadCallback) -> Self {
        self.upload_callback = Some(callback);
        self
    }

    /// Name used in error context.
    pub fn task_name(&self) -> &str {
        &self.task.file_name
    }

    /// Report progress to the logger and callback.
    pub fn report_progress(&self, percent: u8, eta: Option<u32>) {
        self.logger.progress(percent as u32);
        if let Some(ref callback) = self.progress_callback {
            callback(percent, eta);
        }
    }

    pub fn report_upload(&self, destination: Destination, status: UploadStatus) {
        if let Some(ref callback) = self.upload_callback {
            callback(destination, status);
        }
    }
}

/// Results accumulated by the pipeline steps for one task.
#[derive(Debug, Clone)]
pub struct ProductionState {
    pub task_id: String,
    pub started_at: DateTime<Utc>,
    /// Synthesis step output.
    pub synthesis: Option<SynthesisOutput>,
    /// Post-processing step output.
    pub processed: Option<ProcessedAudio>,
    /// Library track mixed under the voice.
    pub music_track: Option<String>,
    /// Delivery step output.
    pub delivery: Option<DeliveryOutput>,
}

impl ProductionState {
    pub fn new(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            started_at: Utc::now(),
            synthesis: None,
            processed: None,
            music_track: None,
            delivery: None,
        }
    }

    /// Final primary audio, once post-processing ran.
    pub fn primary_audio(&self) -> Option<&[u8]> {
        self.processed.as_ref().map(|p| p.primary_audio.as_slice())
    }

    /// Artifact locators from delivery; empty if delivery did not run.
    pub fn artifacts(&self) -> ArtifactLocators {
        self.delivery
            .as_ref()
            .map(|d| d.artifacts.clone())
            .unwrap_or_default()
    }
}

/// Output from the synthesis step.
#[derive(Debug, Clone)]
pub struct SynthesisOutput {
    pub audio: Vec<u8>,
    /// Number of synthesis calls made.
    pub calls: usize,
}

/// Output from the delivery step.
#[derive(Debug, Clone, Default)]
pub struct DeliveryOutput {
    pub artifacts: ArtifactLocators,
    /// Destinations that failed, including local.
    pub failed: Vec<Destination>,
}

/// Result of executing a pipeline step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Step completed successfully.
    Success,
    /// Step was skipped (preconditions not met, but not an error).
    Skipped(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Language, VoiceSettings};
    use std::sync::atomic::{AtomicU8, Ordering};

    #[test]
    fn context_reports_progress_to_callback() {
        let task = Task::new("Hi", Language::English, "v", "V", VoiceSettings::default(), "a.mp3");
        let logger = Arc::new(TaskLogger::detached(task.id.clone(), None));
        let seen = Arc::new(AtomicU8::new(0));
        let seen_clone = seen.clone();

        let ctx = ProductionContext::new(task, logger)
            .with_progress_callback(Box::new(move |p, _| seen_clone.store(p, Ordering::SeqCst)));
        ctx.report_progress(42, None);

        assert_eq!(seen.load(Ordering::SeqCst), 42);
        assert_eq!(ctx.task_name(), "a.mp3");
    }

    #[test]
    fn state_without_delivery_has_no_artifacts() {
        let state = ProductionState::new("t1");
        assert!(state.primary_audio().is_none());
        assert_eq!(state.artifacts(), ArtifactLocators::default());
    }
}
