//! Production driver: claims queued tasks and runs them through the pipeline.
//!
//! The driver is the only writer of `PROCESSING` and terminal task states.
//! It claims one task at a time, so at most one task is ever processing.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::time::MissedTickBehavior;

use crate::analytics::{AnalyticsData, Outcome};
use crate::jobs::QueueHandle;
use crate::logging::{LogConfig, TaskLogger};
use crate::models::{HistoryItem, Task};

use super::errors::PipelineError;
use super::pipeline::{CancelHandle, Pipeline, PipelineRunResult};
use super::types::{ProductionContext, ProductionState};

/// Progress and lifecycle notifications from the driver.
#[derive(Debug, Clone)]
pub enum ProductionEvent {
    Started {
        task_id: String,
        file_name: String,
    },
    Progress {
        task_id: String,
        progress: u8,
        eta_secs: Option<u32>,
    },
    Completed {
        item: HistoryItem,
        /// Final primary audio.
        audio: Arc<Vec<u8>>,
    },
    Failed {
        task_id: String,
        error: String,
        /// A deferred discard removed the task from the queue.
        discarded: bool,
    },
    /// Cancelled mid-production; the task is pending again.
    Interrupted { task_id: String },
}

/// Callback receiving driver events.
pub type EventCallback = Arc<dyn Fn(ProductionEvent) + Send + Sync>;

/// Result of driving a single task.
#[derive(Debug, Clone)]
pub struct DriveResult {
    pub task_id: String,
    pub success: bool,
    /// Error message (if failed).
    pub error: Option<String>,
    pub processing_time_ms: u64,
    /// Steps that completed.
    pub steps_completed: Vec<String>,
    /// Steps that were skipped.
    pub steps_skipped: Vec<String>,
}

impl DriveResult {
    fn success(task_id: String, processing_time_ms: u64, run: PipelineRunResult) -> Self {
        Self {
            task_id,
            success: true,
            error: None,
            processing_time_ms,
            steps_completed: run.steps_completed,
            steps_skipped: run.steps_skipped,
        }
    }

    fn failure(task_id: String, processing_time_ms: u64, error: impl Into<String>) -> Self {
        Self {
            task_id,
            success: false,
            error: Some(error.into()),
            processing_time_ms,
            steps_completed: Vec::new(),
            steps_skipped: Vec::new(),
        }
    }
}

/// Runs claimed tasks through the production pipeline.
pub struct ProductionDriver {
    queue: QueueHandle,
    pipeline: Pipeline,
    analytics: Arc<Mutex<AnalyticsData>>,
    /// Directory for per-task log files.
    log_dir: PathBuf,
    log_config: LogConfig,
    on_event: Option<EventCallback>,
}

impl ProductionDriver {
    pub fn new(queue: QueueHandle, pipeline: Pipeline, analytics: Arc<Mutex<AnalyticsData>>) -> Self {
        Self {
            queue,
            pipeline,
            analytics,
            log_dir: PathBuf::from(".logs"),
            log_config: LogConfig::default(),
            on_event: None,
        }
    }

    pub fn with_logging(mut self, log_dir: impl Into<PathBuf>, config: LogConfig) -> Self {
        self.log_dir = log_dir.into();
        self.log_config = config;
        self
    }

    pub fn with_event_callback(mut self, callback: EventCallback) -> Self {
        self.on_event = Some(callback);
        self
    }

    /// Handle that stops the run loop and the pipeline.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.pipeline.cancel_handle()
    }

    pub fn queue(&self) -> &QueueHandle {
        &self.queue
    }

    /// Claim and produce the next pending task.
    ///
    /// Returns `None` if nothing could be claimed.
    pub async fn drive_once(&self) -> Option<DriveResult> {
        let task = self.queue.lock().claim_next()?;
        let started = Instant::now();

        self.emit(ProductionEvent::Started {
            task_id: task.id.clone(),
            file_name: task.file_name.clone(),
        });

        let ctx = self.context_for(task.clone());
        let mut state = ProductionState::new(task.id.clone());
        let run = self.pipeline.run(&ctx, &mut state).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let result = match run {
            Ok(run_result) => {
                ctx.logger.success(&format!(
                    "Production cycle complete in {:.2}s",
                    elapsed_ms as f64 / 1000.0
                ));
                self.record(&task, true, elapsed_ms);
                self.finish(&task, &state, elapsed_ms, run_result)
            }
            Err(PipelineError::Cancelled { .. }) => self.interrupt(&task, elapsed_ms),
            Err(e) => {
                let message = e.to_string();
                ctx.logger.error(&format!("Production aborted: {}", message));
                self.record(&task, false, elapsed_ms);
                self.abort(&task, elapsed_ms, message)
            }
        };

        ctx.logger.close();
        Some(result)
    }

    /// Drive tasks until cancelled.
    ///
    /// Sleeps until the queue signals new work between batches.
    pub async fn run(&self) {
        let cancel = self.cancel_handle();
        tracing::info!("Production driver started");

        loop {
            while !cancel.is_cancelled() {
                if self.drive_once().await.is_none() {
                    break;
                }
            }
            if cancel.is_cancelled() {
                break;
            }

            tokio::select! {
                _ = self.queue.wait_for_work() => {}
                _ = cancel.cancelled() => break,
            }
        }

        tracing::info!("Production driver stopped");
    }

    fn context_for(&self, task: Task) -> ProductionContext {
        let sink = self.queue.log_sink(&task.id);
        let logger = match TaskLogger::new(
            task.id.clone(),
            &task.file_name,
            &self.log_dir,
            self.log_config.clone(),
            Some(sink.clone()),
        ) {
            Ok(logger) => logger,
            Err(e) => {
                tracing::warn!(task = %task.id, "Task log file unavailable: {}", e);
                TaskLogger::detached(task.id.clone(), Some(sink))
            }
        };

        let queue = self.queue.clone();
        let on_event = self.on_event.clone();
        let task_id = task.id.clone();
        let progress = Box::new(move |percent: u8, eta: Option<u32>| {
            let updated = queue.lock().set_progress(&task_id, percent, eta);
            match updated {
                Ok(progress) => {
                    if let Some(ref callback) = on_event {
                        callback(ProductionEvent::Progress {
                            task_id: task_id.clone(),
                            progress,
                            eta_secs: eta,
                        });
                    }
                }
                Err(e) => tracing::debug!("Progress update dropped: {}", e),
            }
        });

        let queue = self.queue.clone();
        let task_id = task.id.clone();
        let upload = Box::new(move |destination, status| {
            if let Err(e) = queue.lock().set_upload_status(&task_id, destination, status) {
                tracing::debug!("Upload status dropped: {}", e);
            }
        });

        ProductionContext::new(task, Arc::new(logger))
            .with_progress_callback(progress)
            .with_upload_callback(upload)
    }

    fn record(&self, task: &Task, success: bool, elapsed_ms: u64) {
        self.analytics.lock().record(Outcome {
            success,
            characters: task.character_count(),
            words: task.word_count(),
            processing_time_ms: elapsed_ms,
        });
    }

    fn finish(
        &self,
        task: &Task,
        state: &ProductionState,
        elapsed_ms: u64,
        run: PipelineRunResult,
    ) -> DriveResult {
        let completed = self.queue.lock().complete(&task.id, state.artifacts(), elapsed_ms);
        match completed {
            Ok(item) => {
                tracing::info!(task = %task.id, file = %task.file_name, "Task completed");
                let audio = Arc::new(state.primary_audio().unwrap_or_default().to_vec());
                self.emit(ProductionEvent::Completed { item, audio });
                DriveResult::success(task.id.clone(), elapsed_ms, run)
            }
            Err(e) => {
                tracing::error!(task = %task.id, "Could not complete task: {}", e);
                DriveResult::failure(task.id.clone(), elapsed_ms, e.to_string())
            }
        }
    }

    fn abort(&self, task: &Task, elapsed_ms: u64, message: String) -> DriveResult {
        let failed = self.queue.lock().fail(&task.id, &message);
        let discarded = match failed {
            Ok(discarded) => discarded,
            Err(e) => {
                tracing::error!(task = %task.id, "Could not mark task failed: {}", e);
                false
            }
        };
        self.emit(ProductionEvent::Failed {
            task_id: task.id.clone(),
            error: message.clone(),
            discarded,
        });
        DriveResult::failure(task.id.clone(), elapsed_ms, message)
    }

    /// Cancellation is not a production outcome: no analytics, no failure.
    fn interrupt(&self, task: &Task, elapsed_ms: u64) -> DriveResult {
        let requeued = self.queue.lock().requeue(&task.id);
        match requeued {
            Ok(_) => tracing::info!(task = %task.id, "Interrupted task returned to queue"),
            Err(e) => tracing::error!(task = %task.id, "Could not requeue task: {}", e),
        }
        self.emit(ProductionEvent::Interrupted {
            task_id: task.id.clone(),
        });
        DriveResult::failure(task.id.clone(), elapsed_ms, "production interrupted")
    }

    fn emit(&self, event: ProductionEvent) {
        if let Some(ref callback) = self.on_event {
            callback(event);
        }
    }
}

/// Count down processing ETAs once per second until cancelled.
pub async fn run_eta_ticker(queue: QueueHandle, cancel: CancelHandle) {
    let mut interval = tokio::time::interval(Duration::from_secs(1));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval.tick().await;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                queue.lock().tick_eta();
            }
            _ = cancel.cancelled() => break,
        }
    }
}
