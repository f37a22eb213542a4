//! Deferred job materialization.
//!
//! Scheduled jobs wait until their execution instant, then every embedded
//! task is offered to the queue (each one checked against the duplicate
//! policy on its own) and the job becomes `EXECUTED`. A job fires at most
//! once; cancelled jobs never fire.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use thiserror::Error;
use tokio::time::MissedTickBehavior;

use crate::jobs::{EnqueueOutcome, QueueHandle};
use crate::models::{JobState, ScheduledJob};
use crate::orchestrator::CancelHandle;

/// Errors from scheduling operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("Execution time {execute_at} is not in the future (now {now})")]
    NotInFuture {
        execute_at: DateTime<Utc>,
        now: DateTime<Utc>,
    },

    #[error("Scheduled job '{0}' has no tasks")]
    NoTasks(String),

    #[error("Scheduled job not found: {0}")]
    NotFound(String),

    #[error("Scheduled job {id} is {state:?}, only pending jobs can be cancelled")]
    NotPending { id: String, state: JobState },
}

/// Result type for scheduling operations.
pub type ScheduleResult<T> = Result<T, ScheduleError>;

/// A job whose tasks were just offered to the queue.
#[derive(Debug, Clone)]
pub struct MaterializedJob {
    pub job_id: String,
    pub name: String,
    pub notify_on_completion: bool,
    /// One outcome per embedded task, in job order.
    pub outcomes: Vec<EnqueueOutcome>,
}

impl MaterializedJob {
    pub fn queued_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_queued()).count()
    }
}

/// Callback receiving materialized jobs.
pub type MaterializedCallback = Arc<dyn Fn(&MaterializedJob) + Send + Sync>;

/// Holds scheduled jobs and injects them into the queue when due.
pub struct Scheduler {
    jobs: Mutex<Vec<ScheduledJob>>,
    queue: QueueHandle,
    on_materialized: Option<MaterializedCallback>,
}

impl Scheduler {
    pub fn new(queue: QueueHandle) -> Self {
        Self {
            jobs: Mutex::new(Vec::new()),
            queue,
            on_materialized: None,
        }
    }

    pub fn with_callback(mut self, callback: MaterializedCallback) -> Self {
        self.on_materialized = Some(callback);
        self
    }

    /// Replace the job list with a saved snapshot.
    pub fn restore(&self, jobs: Vec<ScheduledJob>) {
        let pending = jobs.iter().filter(|j| j.state() == JobState::Pending).count();
        *self.jobs.lock() = jobs;
        tracing::info!(pending, "Scheduled jobs restored");
    }

    /// Copy of every job, in creation order.
    pub fn jobs(&self) -> Vec<ScheduledJob> {
        self.jobs.lock().clone()
    }

    pub fn get(&self, id: &str) -> Option<ScheduledJob> {
        self.jobs.lock().iter().find(|j| j.id == id).cloned()
    }

    pub fn pending_count(&self) -> usize {
        self.jobs
            .lock()
            .iter()
            .filter(|j| j.state() == JobState::Pending)
            .count()
    }

    /// Add a job. Its execution time must be strictly in the future.
    pub fn create_job(&self, job: ScheduledJob) -> ScheduleResult<String> {
        self.create_job_at(job, Utc::now())
    }

    /// Add a job, judging "future" against `now`.
    pub fn create_job_at(&self, mut job: ScheduledJob, now: DateTime<Utc>) -> ScheduleResult<String> {
        if job.execute_at <= now {
            return Err(ScheduleError::NotInFuture {
                execute_at: job.execute_at,
                now,
            });
        }
        if job.tasks.is_empty() {
            return Err(ScheduleError::NoTasks(job.name));
        }

        job.state = JobState::Pending;
        job.executed_at = None;
        let id = job.id.clone();
        tracing::info!(job = %id, name = %job.name, at = %job.execute_at, "Job scheduled");
        self.jobs.lock().push(job);
        Ok(id)
    }

    /// Cancel a pending job so it never fires.
    pub fn cancel_job(&self, id: &str) -> ScheduleResult<()> {
        let mut jobs = self.jobs.lock();
        let job = jobs
            .iter_mut()
            .find(|j| j.id == id)
            .ok_or_else(|| ScheduleError::NotFound(id.to_string()))?;
        if job.state != JobState::Pending {
            return Err(ScheduleError::NotPending {
                id: id.to_string(),
                state: job.state,
            });
        }
        job.state = JobState::Cancelled;
        tracing::info!(job = %id, "Scheduled job cancelled");
        Ok(())
    }

    /// Delete a job in any state.
    pub fn remove_job(&self, id: &str) -> ScheduleResult<ScheduledJob> {
        let mut jobs = self.jobs.lock();
        let index = jobs
            .iter()
            .position(|j| j.id == id)
            .ok_or_else(|| ScheduleError::NotFound(id.to_string()))?;
        Ok(jobs.remove(index))
    }

    /// Materialize every job due at `now`.
    ///
    /// Jobs are marked executed before their tasks are enqueued, so a job
    /// can never fire twice. Tasks are stamped with the injection time and
    /// join the back of the queue.
    pub fn tick(&self, now: DateTime<Utc>) -> Vec<MaterializedJob> {
        let due: Vec<ScheduledJob> = {
            let mut jobs = self.jobs.lock();
            jobs.iter_mut()
                .filter(|j| j.is_due(now))
                .map(|job| {
                    job.state = JobState::Executed;
                    job.executed_at = Some(now);
                    job.clone()
                })
                .collect()
        };

        due.into_iter()
            .map(|job| {
                let tasks = job
                    .tasks
                    .into_iter()
                    .map(|t| t.with_created_at(now))
                    .collect();
                let materialized = MaterializedJob {
                    outcomes: self.queue.enqueue_all(tasks),
                    job_id: job.id,
                    name: job.name,
                    notify_on_completion: job.notify_on_completion,
                };
                tracing::info!(
                    job = %materialized.job_id,
                    queued = materialized.queued_count(),
                    total = materialized.outcomes.len(),
                    "Scheduled job executed"
                );
                if let Some(ref callback) = self.on_materialized {
                    callback(&materialized);
                }
                materialized
            })
            .collect()
    }

    /// Check for due jobs every `interval` until cancelled.
    pub async fn run(&self, interval: Duration, cancel: CancelHandle) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick(Utc::now());
                }
                _ = cancel.cancelled() => break,
            }
        }
        tracing::debug!("Scheduler stopped");
    }
}
