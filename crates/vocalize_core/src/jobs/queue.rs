//! Task queue state machine and completed-item history.
//!
//! The queue owns every task state transition:
//! `PENDING -> PROCESSING -> {COMPLETED | FAILED}` and `FAILED -> PENDING`.
//! Completed tasks leave the queue and become history items.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::{Mutex, MutexGuard};
use thiserror::Error;
use tokio::sync::Notify;

use crate::config::QueueSettings;
use crate::logging::{LogEntry, LogSink};
use crate::models::{
    ArtifactLocators, Destination, HistoryItem, Task, TaskStatus, UploadStatus,
};

/// Progress assigned when a task is claimed.
pub const CLAIM_PROGRESS: u8 = 5;

/// Characters synthesized per second, for the initial ETA.
const ETA_CHARS_PER_SEC: u64 = 30;

/// Errors from invalid queue operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    #[error("Task not found: {0}")]
    NotFound(String),

    #[error("Cannot {action} task {id} while it is {status}")]
    InvalidTransition {
        id: String,
        status: TaskStatus,
        action: &'static str,
    },

    #[error("Task {id} reached the retry limit of {limit}")]
    RetryLimitReached { id: String, limit: u32 },
}

/// Result type for queue operations.
pub type QueueResult<T> = Result<T, QueueError>;

/// Result of submitting a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// Accepted with this id.
    Queued(String),
    /// Same trimmed text is already queued or in history.
    Duplicate,
    /// Trimmed text is empty.
    Empty,
}

impl EnqueueOutcome {
    pub fn is_queued(&self) -> bool {
        matches!(self, EnqueueOutcome::Queued(_))
    }
}

/// Result of a discard request.
#[derive(Debug, Clone)]
pub enum DiscardOutcome {
    Removed(Task),
    /// Task is processing; it will be removed if it fails.
    Deferred,
}

/// Task counts by state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueueStats {
    pub total: usize,
    pub pending: usize,
    pub processing: usize,
    pub failed: usize,
}

/// Queue behavior knobs.
#[derive(Debug, Clone)]
pub struct QueuePolicy {
    pub skip_duplicates: bool,
    /// `None` means unbounded retries.
    pub max_retries: Option<u32>,
    pub history_limit: usize,
}

impl Default for QueuePolicy {
    fn default() -> Self {
        Self::from(&QueueSettings::default())
    }
}

impl From<&QueueSettings> for QueuePolicy {
    fn from(settings: &QueueSettings) -> Self {
        Self {
            skip_duplicates: settings.skip_duplicates,
            max_retries: settings.max_retries,
            history_limit: settings.history_limit,
        }
    }
}

/// Live tasks plus the bounded, newest-first history.
#[derive(Debug, Default)]
pub struct TaskQueue {
    tasks: Vec<Task>,
    history: VecDeque<HistoryItem>,
    policy: QueuePolicy,
    pending_discards: HashSet<String>,
}

impl TaskQueue {
    pub fn new(policy: QueuePolicy) -> Self {
        Self {
            tasks: Vec::new(),
            history: VecDeque::new(),
            policy,
            pending_discards: HashSet::new(),
        }
    }

    pub fn policy(&self) -> &QueuePolicy {
        &self.policy
    }

    pub fn set_skip_duplicates(&mut self, skip: bool) {
        self.policy.skip_duplicates = skip;
    }

    /// Replace history with a restored snapshot (newest first).
    pub fn restore_history(&mut self, items: Vec<HistoryItem>) {
        self.history = items.into_iter().take(self.policy.history_limit).collect();
        tracing::info!("Restored {} history items", self.history.len());
    }

    /// Live tasks in submission order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Completed items, newest first.
    pub fn history(&self) -> impl Iterator<Item = &HistoryItem> {
        self.history.iter()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn history_snapshot(&self) -> Vec<HistoryItem> {
        self.history.iter().cloned().collect()
    }

    /// The task currently being produced, if any.
    pub fn processing(&self) -> Option<&Task> {
        self.tasks
            .iter()
            .find(|t| t.status == TaskStatus::Processing)
    }

    pub fn has_pending(&self) -> bool {
        self.tasks.iter().any(|t| t.status == TaskStatus::Pending)
    }

    /// Whether `text` duplicates a queued, processing, or completed task.
    ///
    /// Exact match on trimmed text. Always false when skipping is off.
    pub fn is_duplicate(&self, text: &str) -> bool {
        if !self.policy.skip_duplicates {
            return false;
        }
        let text = text.trim();
        self.tasks.iter().any(|t| {
            matches!(t.status, TaskStatus::Pending | TaskStatus::Processing)
                && t.trimmed_text() == text
        }) || self.history.iter().any(|h| h.task.trimmed_text() == text)
    }

    /// Add a task unless its text is empty or a duplicate.
    pub fn enqueue(&mut self, mut task: Task) -> EnqueueOutcome {
        if task.trimmed_text().is_empty() {
            tracing::debug!("Ignoring task with empty text");
            return EnqueueOutcome::Empty;
        }
        if self.is_duplicate(&task.text) {
            tracing::info!(file = %task.file_name, "Skipping duplicate text");
            return EnqueueOutcome::Duplicate;
        }

        task.status = TaskStatus::Pending;
        task.progress = 0;
        task.estimated_remaining_secs = None;
        let id = task.id.clone();
        tracing::debug!(task = %id, file = %task.file_name, "Task queued");
        self.tasks.push(task);
        EnqueueOutcome::Queued(id)
    }

    /// Claim the earliest-created pending task.
    ///
    /// Returns `None` if nothing is pending or a task is already processing.
    /// Ties on creation time go to the earlier submission.
    pub fn claim_next(&mut self) -> Option<Task> {
        if self.processing().is_some() {
            return None;
        }

        let index = self
            .tasks
            .iter()
            .enumerate()
            .filter(|(_, t)| t.status == TaskStatus::Pending)
            .min_by_key(|(i, t)| (t.created_at, *i))
            .map(|(i, _)| i)?;

        let task = &mut self.tasks[index];
        task.status = TaskStatus::Processing;
        task.progress = CLAIM_PROGRESS;
        task.estimated_remaining_secs = Some(initial_eta(task.character_count()));
        task.started_at = Some(Utc::now());
        task.log.push(LogEntry::info(format!(
            "Production started for {} (attempt {})",
            task.file_name,
            task.retry_count + 1
        )));
        Some(task.clone())
    }

    /// Raise a processing task's progress. Progress never decreases.
    pub fn set_progress(&mut self, id: &str, progress: u8, eta: Option<u32>) -> QueueResult<u8> {
        let task = self.processing_mut(id, "update progress of")?;
        task.progress = task.progress.max(progress.min(100));
        if eta.is_some() {
            task.estimated_remaining_secs = eta;
        }
        Ok(task.progress)
    }

    /// Count down the ETA of processing tasks by one second.
    ///
    /// Returns how many tasks were updated.
    pub fn tick_eta(&mut self) -> usize {
        let mut ticked = 0;
        for task in self.tasks.iter_mut() {
            if task.status != TaskStatus::Processing {
                continue;
            }
            if let Some(eta) = task.estimated_remaining_secs.as_mut() {
                if *eta > 0 {
                    *eta -= 1;
                    ticked += 1;
                }
            }
        }
        ticked
    }

    pub fn set_upload_status(
        &mut self,
        id: &str,
        destination: Destination,
        status: UploadStatus,
    ) -> QueueResult<()> {
        let task = self.get_mut(id)?;
        task.upload_statuses.set(destination, status);
        Ok(())
    }

    /// Append to a live task's log. Returns false if the task is gone.
    pub fn append_log(&mut self, id: &str, entry: LogEntry) -> bool {
        match self.tasks.iter_mut().find(|t| t.id == id) {
            Some(task) => {
                task.log.push(entry);
                true
            }
            None => false,
        }
    }

    /// Finish a processing task and move it into history.
    pub fn complete(
        &mut self,
        id: &str,
        artifacts: ArtifactLocators,
        processing_time_ms: u64,
    ) -> QueueResult<HistoryItem> {
        self.processing_mut(id, "complete")?;
        let index = self.index_of(id)?;
        let task = self.tasks.remove(index);
        self.pending_discards.remove(id);

        let item = HistoryItem::from_completed(task, artifacts, processing_time_ms);
        self.history.push_front(item.clone());
        self.history.truncate(self.policy.history_limit);
        Ok(item)
    }

    /// Mark a processing task as failed.
    ///
    /// Returns true if a deferred discard removed the task from the queue.
    pub fn fail(&mut self, id: &str, message: &str) -> QueueResult<bool> {
        let task = self.processing_mut(id, "fail")?;
        task.status = TaskStatus::Failed;
        task.last_error = Some(message.to_string());
        task.progress = 0;
        task.estimated_remaining_secs = None;
        self.apply_deferred_discard(id)
    }

    /// Put an interrupted processing task back to pending.
    ///
    /// The retry count is untouched and the task keeps its creation time,
    /// so it is claimed first again. Returns true if a deferred discard
    /// removed it instead.
    pub fn requeue(&mut self, id: &str) -> QueueResult<bool> {
        let task = self.processing_mut(id, "requeue")?;
        task.status = TaskStatus::Pending;
        task.progress = 0;
        task.estimated_remaining_secs = None;
        task.started_at = None;
        task.log.push(LogEntry::info("Production interrupted; task returned to the queue"));
        self.apply_deferred_discard(id)
    }

    /// Return a failed task to pending. Returns the new retry count.
    pub fn retry(&mut self, id: &str) -> QueueResult<u32> {
        let max_retries = self.policy.max_retries;
        let task = self.get_mut(id)?;
        if task.status != TaskStatus::Failed {
            return Err(QueueError::InvalidTransition {
                id: id.to_string(),
                status: task.status,
                action: "retry",
            });
        }
        if let Some(limit) = max_retries {
            if task.retry_count >= limit {
                return Err(QueueError::RetryLimitReached {
                    id: id.to_string(),
                    limit,
                });
            }
        }

        task.retry_count += 1;
        task.status = TaskStatus::Pending;
        task.progress = 0;
        task.estimated_remaining_secs = None;
        task.log.push(LogEntry::info(format!(
            "Retry requested: starting recovery attempt #{}",
            task.retry_count
        )));
        Ok(task.retry_count)
    }

    /// Remove a pending or failed task; defer removal of a processing one.
    pub fn discard(&mut self, id: &str) -> QueueResult<DiscardOutcome> {
        let index = self.index_of(id)?;
        match self.tasks[index].status {
            TaskStatus::Processing => {
                self.pending_discards.insert(id.to_string());
                tracing::info!(task = %id, "Discard deferred until task leaves processing");
                Ok(DiscardOutcome::Deferred)
            }
            _ => Ok(DiscardOutcome::Removed(self.tasks.remove(index))),
        }
    }

    pub fn stats(&self) -> QueueStats {
        let count = |status| self.tasks.iter().filter(|t| t.status == status).count();
        QueueStats {
            total: self.tasks.len(),
            pending: count(TaskStatus::Pending),
            processing: count(TaskStatus::Processing),
            failed: count(TaskStatus::Failed),
        }
    }

    /// Mean progress over live tasks, rounded; 0 when empty.
    pub fn batch_progress(&self) -> u8 {
        if self.tasks.is_empty() {
            return 0;
        }
        let total: u64 = self.tasks.iter().map(|t| t.progress as u64).sum();
        let mean = total as f64 / self.tasks.len() as f64;
        mean.round() as u8
    }

    fn apply_deferred_discard(&mut self, id: &str) -> QueueResult<bool> {
        if !self.pending_discards.remove(id) {
            return Ok(false);
        }
        let index = self.index_of(id)?;
        self.tasks.remove(index);
        tracing::info!(task = %id, "Applied deferred discard");
        Ok(true)
    }

    fn index_of(&self, id: &str) -> QueueResult<usize> {
        self.tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| QueueError::NotFound(id.to_string()))
    }

    fn get_mut(&mut self, id: &str) -> QueueResult<&mut Task> {
        self.tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| QueueError::NotFound(id.to_string()))
    }

    fn processing_mut(&mut self, id: &str, action: &'static str) -> QueueResult<&mut Task> {
        let task = self.get_mut(id)?;
        if task.status != TaskStatus::Processing {
            return Err(QueueError::InvalidTransition {
                id: id.to_string(),
                status: task.status,
                action,
            });
        }
        Ok(task)
    }
}

/// Initial ETA: one second per 30 characters, rounded up.
fn initial_eta(chars: u64) -> u32 {
    chars.div_ceil(ETA_CHARS_PER_SEC) as u32
}

/// Shared handle to the queue that wakes the driver on new work.
#[derive(Clone)]
pub struct QueueHandle {
    inner: Arc<Mutex<TaskQueue>>,
    wake: Arc<Notify>,
}

impl QueueHandle {
    pub fn new(queue: TaskQueue) -> Self {
        Self {
            inner: Arc::new(Mutex::new(queue)),
            wake: Arc::new(Notify::new()),
        }
    }

    /// Lock the queue. Never hold the guard across an `.await`.
    pub fn lock(&self) -> MutexGuard<'_, TaskQueue> {
        self.inner.lock()
    }

    pub fn enqueue(&self, task: Task) -> EnqueueOutcome {
        let outcome = self.inner.lock().enqueue(task);
        if outcome.is_queued() {
            self.wake.notify_one();
        }
        outcome
    }

    /// Submit several tasks; each is checked against the duplicate policy.
    pub fn enqueue_all(&self, tasks: Vec<Task>) -> Vec<EnqueueOutcome> {
        let outcomes: Vec<EnqueueOutcome> = {
            let mut queue = self.inner.lock();
            tasks.into_iter().map(|t| queue.enqueue(t)).collect()
        };
        if outcomes.iter().any(EnqueueOutcome::is_queued) {
            self.wake.notify_one();
        }
        outcomes
    }

    pub fn retry(&self, id: &str) -> QueueResult<u32> {
        let count = self.inner.lock().retry(id)?;
        self.wake.notify_one();
        Ok(count)
    }

    pub fn discard(&self, id: &str) -> QueueResult<DiscardOutcome> {
        self.inner.lock().discard(id)
    }

    /// Wait until work may be available.
    pub async fn wait_for_work(&self) {
        self.wake.notified().await;
    }

    pub fn wake(&self) {
        self.wake.notify_one();
    }

    /// Sink appending entries to one task's log.
    pub fn log_sink(&self, task_id: &str) -> LogSink {
        let inner = self.inner.clone();
        let task_id = task_id.to_string();
        Arc::new(move |entry| {
            inner.lock().append_log(&task_id, entry);
        })
    }
}
