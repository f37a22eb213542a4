//! Studio runtime: wires the queue, driver, scheduler and stores together.
//!
//! `Studio::start` restores persisted state and spawns four cooperative
//! loops on the current tokio runtime:
//!
//! ```text
//! Studio
//!     ├── driver      claims and produces tasks one at a time
//!     ├── eta ticker  counts processing ETAs down every second
//!     ├── scheduler   injects due scheduled jobs
//!     └── snapshots   writes history, jobs and analytics periodically
//! ```
//!
//! All four share one cancel handle; `shutdown` trips it, waits for each
//! loop to stop at its next suspension point and writes a final snapshot.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, MutexGuard};
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::analytics::AnalyticsData;
use crate::config::{ConfigError, ConfigManager, Settings};
use crate::jobs::{
    DiscardOutcome, EnqueueOutcome, QueueHandle, QueuePolicy, QueueResult, TaskFactory, TaskQueue,
};
use crate::models::{CharacterVoice, Suggestion, VoicePreset};
use crate::orchestrator::{
    advise, create_production_pipeline, run_eta_ticker, CancelHandle, Collaborators,
    EventCallback, MusicLibrary, ProductionDriver, TextAdvisor,
};
use crate::scheduler::{MaterializedCallback, ScheduleError, ScheduleResult, Scheduler};
use crate::storage::{
    JsonFileStore, KeyValueStore, PresetStore, SnapshotStore, StorageError, StorageResult,
};

/// Errors starting the studio.
#[derive(Error, Debug)]
pub enum StudioError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result type for studio operations.
pub type StudioResult<T> = Result<T, StudioError>;

/// Optional hooks for a studio.
#[derive(Default)]
pub struct StudioHooks {
    pub on_event: Option<EventCallback>,
    pub on_materialized: Option<MaterializedCallback>,
}

/// A running production studio.
pub struct Studio {
    queue: QueueHandle,
    scheduler: Arc<Scheduler>,
    analytics: Arc<Mutex<AnalyticsData>>,
    factory: Mutex<TaskFactory>,
    presets: Mutex<PresetStore>,
    snapshots: SnapshotStore,
    advisor: Option<Arc<dyn TextAdvisor>>,
    cancel: CancelHandle,
    handles: Vec<JoinHandle<()>>,
}

impl Studio {
    /// Start a studio from a loaded config, persisting under its data folder.
    pub fn open(
        config: &ConfigManager,
        collaborators: Collaborators,
        hooks: StudioHooks,
    ) -> StudioResult<Self> {
        config.ensure_dirs_exist()?;
        let store: Arc<dyn KeyValueStore> = Arc::new(JsonFileStore::new(config.data_folder()));
        Self::start(config.settings(), collaborators, store, hooks)
    }

    /// Start a studio on an explicit store.
    ///
    /// Must be called inside a tokio runtime.
    pub fn start(
        settings: &Settings,
        collaborators: Collaborators,
        store: Arc<dyn KeyValueStore>,
        hooks: StudioHooks,
    ) -> StudioResult<Self> {
        let snapshots = SnapshotStore::new(store.clone());

        let mut queue = TaskQueue::new(QueuePolicy::from(&settings.queue));
        queue.restore_history(restore_or_default(snapshots.load_history(), "history"));
        let queue = QueueHandle::new(queue);

        let analytics = Arc::new(Mutex::new(restore_or_default(
            snapshots.load_analytics(),
            "analytics",
        )));

        let mut scheduler = Scheduler::new(queue.clone());
        if let Some(callback) = hooks.on_materialized {
            scheduler = scheduler.with_callback(callback);
        }
        scheduler.restore(restore_or_default(snapshots.load_jobs(), "scheduled jobs"));
        let scheduler = Arc::new(scheduler);

        let presets = PresetStore::load(store)?;

        let pipeline = create_production_pipeline(
            &collaborators,
            MusicLibrary::default(),
            PathBuf::from(&settings.paths.output_folder),
        );
        let mut driver = ProductionDriver::new(queue.clone(), pipeline, analytics.clone())
            .with_logging(&settings.paths.logs_folder, settings.logging.log_config());
        if let Some(callback) = hooks.on_event {
            driver = driver.with_event_callback(callback);
        }
        let cancel = driver.cancel_handle();

        let factory = TaskFactory::new(&settings.production, &settings.queue);

        let handles = spawn_loops(
            driver,
            queue.clone(),
            scheduler.clone(),
            snapshots.clone(),
            analytics.clone(),
            settings,
            cancel.clone(),
        );

        tracing::info!(
            history = queue.lock().history_len(),
            scheduled = scheduler.pending_count(),
            "Studio started"
        );

        Ok(Self {
            queue,
            scheduler,
            analytics,
            factory: Mutex::new(factory),
            presets: Mutex::new(presets),
            snapshots,
            advisor: collaborators.advisor,
            cancel,
            handles,
        })
    }

    pub fn queue(&self) -> &QueueHandle {
        &self.queue
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Task defaults. Do not hold the guard across an `.await`.
    pub fn factory(&self) -> MutexGuard<'_, TaskFactory> {
        self.factory.lock()
    }

    /// Copy of the running totals.
    pub fn analytics(&self) -> AnalyticsData {
        self.analytics.lock().clone()
    }

    pub fn reset_analytics(&self) {
        self.analytics.lock().reset();
    }

    /// Queue manually entered text.
    pub fn submit_text(&self, text: &str) -> EnqueueOutcome {
        let task = self.factory.lock().manual(text);
        match task {
            Some(task) => self.queue.enqueue(task),
            None => EnqueueOutcome::Empty,
        }
    }

    /// Queue one task per line of a batch file.
    pub fn submit_batch(&self, content: &str) -> Vec<EnqueueOutcome> {
        let tasks = self.factory.lock().batch(content);
        self.queue.enqueue_all(tasks)
    }

    /// Queue a multi-character script as one story task.
    pub fn submit_story(&self, script: &str, cast: &[CharacterVoice]) -> EnqueueOutcome {
        let task = self.factory.lock().story(script, cast);
        match task {
            Some(task) => self.queue.enqueue(task),
            None => EnqueueOutcome::Empty,
        }
    }

    /// Schedule `text` for production at `execute_at`.
    pub fn schedule(
        &self,
        name: &str,
        text: &str,
        execute_at: DateTime<Utc>,
    ) -> ScheduleResult<String> {
        let job = self.factory.lock().scheduled(name, text, execute_at);
        match job {
            Some(job) => self.scheduler.create_job(job),
            None => Err(ScheduleError::NoTasks(name.to_string())),
        }
    }

    pub fn retry(&self, id: &str) -> QueueResult<u32> {
        self.queue.retry(id)
    }

    pub fn discard(&self, id: &str) -> QueueResult<DiscardOutcome> {
        self.queue.discard(id)
    }

    /// Ask the text advisor about `text` and adopt its suggestion.
    ///
    /// Returns the active suggestion, which is unchanged when no advisor
    /// is configured or it has nothing to say.
    pub async fn refresh_suggestion(&self, text: &str) -> Option<Suggestion> {
        if let Some(ref advisor) = self.advisor {
            if let Some(suggestion) = advise(advisor.as_ref(), text).await {
                self.factory.lock().set_suggestion(suggestion);
            }
        }
        self.factory.lock().suggestion().cloned()
    }

    pub fn presets(&self) -> Vec<VoicePreset> {
        self.presets.lock().presets().to_vec()
    }

    pub fn save_preset(&self, preset: VoicePreset) -> StorageResult<()> {
        self.presets.lock().save(preset)
    }

    pub fn delete_preset(&self, id: &str) -> StorageResult<bool> {
        self.presets.lock().delete(id)
    }

    /// Make a saved preset the default for new tasks.
    pub fn apply_preset(&self, id: &str) -> bool {
        let preset = self.presets.lock().get(id).cloned();
        match preset {
            Some(preset) => {
                self.factory.lock().apply_preset(&preset);
                true
            }
            None => false,
        }
    }

    /// Write history, scheduled jobs and analytics now.
    pub fn snapshot(&self) -> StorageResult<()> {
        write_snapshot(&self.snapshots, &self.queue, &self.scheduler, &self.analytics)
    }

    pub fn is_running(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    /// Stop every loop and write a final snapshot.
    ///
    /// A task in flight stops before its next pipeline step and goes back
    /// to pending; it counts neither as a success nor as a failure.
    pub async fn shutdown(self) -> StorageResult<()> {
        self.cancel.cancel();
        self.queue.wake();
        for handle in self.handles {
            if let Err(e) = handle.await {
                tracing::warn!("Studio loop ended abnormally: {}", e);
            }
        }
        let result = write_snapshot(&self.snapshots, &self.queue, &self.scheduler, &self.analytics);
        tracing::info!("Studio stopped");
        result
    }
}

fn restore_or_default<T: Default>(loaded: StorageResult<T>, what: &str) -> T {
    match loaded {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("Could not restore {}, starting empty: {}", what, e);
            T::default()
        }
    }
}

fn write_snapshot(
    snapshots: &SnapshotStore,
    queue: &QueueHandle,
    scheduler: &Scheduler,
    analytics: &Mutex<AnalyticsData>,
) -> StorageResult<()> {
    let history = queue.lock().history_snapshot();
    let jobs = scheduler.jobs();
    let totals = analytics.lock().clone();

    snapshots.save_history(&history)?;
    snapshots.save_jobs(&jobs)?;
    snapshots.save_analytics(&totals)
}

fn spawn_loops(
    driver: ProductionDriver,
    queue: QueueHandle,
    scheduler: Arc<Scheduler>,
    snapshots: SnapshotStore,
    analytics: Arc<Mutex<AnalyticsData>>,
    settings: &Settings,
    cancel: CancelHandle,
) -> Vec<JoinHandle<()>> {
    let check_interval = Duration::from_secs(settings.scheduler.check_interval_secs.max(1));
    let snapshot_interval = Duration::from_secs(settings.scheduler.snapshot_interval_secs.max(1));

    let driver_loop = tokio::spawn(async move { driver.run().await });

    let ticker = tokio::spawn(run_eta_ticker(queue.clone(), cancel.clone()));

    let scheduler_loop = {
        let scheduler = scheduler.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { scheduler.run(check_interval, cancel).await })
    };

    let snapshot_loop = tokio::spawn(async move {
        let mut interval = tokio::time::interval(snapshot_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval.tick().await;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let (snapshots, queue, scheduler, analytics) =
                        (snapshots.clone(), queue.clone(), scheduler.clone(), analytics.clone());
                    let written = tokio::task::spawn_blocking(move || {
                        write_snapshot(&snapshots, &queue, &scheduler, &analytics)
                    })
                    .await;
                    match written {
                        Ok(Ok(())) => tracing::debug!("Snapshot written"),
                        Ok(Err(e)) => tracing::warn!("Snapshot failed: {}", e),
                        Err(e) => tracing::warn!("Snapshot writer panicked: {}", e),
                    }
                }
                _ = cancel.cancelled() => break,
            }
        }
    });

    vec![driver_loop, ticker, scheduler_loop, snapshot_loop]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TaskStatus;
    use crate::orchestrator::testing::{FakeProcessor, FakeSynthesizer, StaticMusic};
    use crate::orchestrator::ProductionEvent;
    use crate::storage::MemoryStore;
    use chrono::Duration as ChronoDuration;
    use tempfile::tempdir;
    use tokio::sync::mpsc;

    fn settings(root: &std::path::Path) -> Settings {
        let mut settings = Settings::default();
        settings.paths.output_folder = root.join("out").to_string_lossy().to_string();
        settings.paths.logs_folder = root.join("logs").to_string_lossy().to_string();
        settings.paths.data_folder = root.join("data").to_string_lossy().to_string();
        settings
    }

    fn collaborators() -> Collaborators {
        Collaborators::new(
            Arc::new(FakeSynthesizer::default()),
            Arc::new(FakeProcessor::default()),
            Arc::new(StaticMusic),
        )
    }

    #[tokio::test]
    async fn submitted_text_is_produced_and_persisted() {
        let dir = tempdir().unwrap();
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let hooks = StudioHooks {
            on_event: Some(Arc::new(move |event| {
                if let ProductionEvent::Completed { item, .. } = event {
                    let _ = tx.send(item);
                }
            })),
            on_materialized: None,
        };
        let studio =
            Studio::start(&settings(dir.path()), collaborators(), store.clone(), hooks).unwrap();

        assert!(studio.submit_text("Hello studio").is_queued());
        let item = tokio::time::timeout(std::time::Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(item.text(), "Hello studio");
        assert_eq!(studio.analytics().total_success, 1);
        assert!(studio.queue().lock().is_empty());

        studio.shutdown().await.unwrap();

        let restored = SnapshotStore::new(store).load_history().unwrap();
        assert_eq!(restored.len(), 1);
        assert_eq!(restored[0].task.status(), TaskStatus::Completed);
    }

    #[tokio::test]
    async fn restart_restores_history_for_duplicate_checks() {
        let dir = tempdir().unwrap();
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let hooks = StudioHooks {
            on_event: Some(Arc::new(move |event| {
                if matches!(event, ProductionEvent::Completed { .. }) {
                    let _ = tx.send(());
                }
            })),
            on_materialized: None,
        };
        let first =
            Studio::start(&settings(dir.path()), collaborators(), store.clone(), hooks).unwrap();
        first.submit_text("Only once");
        tokio::time::timeout(std::time::Duration::from_secs(5), rx.recv())
            .await
            .unwrap();
        first.shutdown().await.unwrap();

        let second = Studio::start(
            &settings(dir.path()),
            collaborators(),
            store,
            StudioHooks::default(),
        )
        .unwrap();
        assert_eq!(second.submit_text("Only once"), EnqueueOutcome::Duplicate);
        assert_eq!(second.analytics().total_generated, 1);
        second.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn scheduled_jobs_survive_restart() {
        let dir = tempdir().unwrap();
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let studio = Studio::start(
            &settings(dir.path()),
            collaborators(),
            store.clone(),
            StudioHooks::default(),
        )
        .unwrap();

        let id = studio
            .schedule("Tomorrow", "Morning news", Utc::now() + ChronoDuration::days(1))
            .unwrap();
        assert!(studio
            .schedule("Yesterday", "Old news", Utc::now() - ChronoDuration::days(1))
            .is_err());
        studio.shutdown().await.unwrap();

        let restored = Studio::start(
            &settings(dir.path()),
            collaborators(),
            store,
            StudioHooks::default(),
        )
        .unwrap();
        assert_eq!(restored.scheduler().pending_count(), 1);
        assert!(restored.scheduler().get(&id).is_some());
        assert!(restored.queue().lock().is_empty());
        restored.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn presets_apply_to_new_tasks() {
        let dir = tempdir().unwrap();
        let studio = Studio::start(
            &settings(dir.path()),
            collaborators(),
            Arc::new(MemoryStore::new()),
            StudioHooks::default(),
        )
        .unwrap();

        let mut voice = crate::models::VoiceSettings::default();
        voice.stability = 0.9;
        let preset = VoicePreset::new("Calm", "v9", "Nova", voice);
        studio.save_preset(preset.clone()).unwrap();

        assert!(studio.apply_preset(&preset.id));
        assert!(!studio.apply_preset("missing"));
        assert_eq!(studio.factory().settings().stability, 0.9);
        assert_eq!(studio.presets().len(), 1);
        assert!(studio.delete_preset(&preset.id).unwrap());

        studio.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn periodic_snapshot_reaches_file_store() {
        let dir = tempdir().unwrap();
        let mut settings = settings(dir.path());
        settings.scheduler.snapshot_interval_secs = 1;
        let store: Arc<dyn KeyValueStore> = Arc::new(JsonFileStore::new(dir.path().join("data")));
        let studio =
            Studio::start(&settings, collaborators(), store.clone(), StudioHooks::default())
                .unwrap();
        studio.submit_text("Saved without shutdown");

        let snapshots = SnapshotStore::new(store);
        let mut saved = Vec::new();
        for _ in 0..100 {
            saved = snapshots.load_history().unwrap();
            if !saved.is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        }
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].text(), "Saved without shutdown");

        studio.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn blank_submissions_are_rejected() {
        let dir = tempdir().unwrap();
        let studio = Studio::start(
            &settings(dir.path()),
            collaborators(),
            Arc::new(MemoryStore::new()),
            StudioHooks::default(),
        )
        .unwrap();

        assert_eq!(studio.submit_text("   "), EnqueueOutcome::Empty);
        assert_eq!(studio.submit_story("no colon here", &[]), EnqueueOutcome::Empty);
        assert!(studio.submit_batch("\n\n").is_empty());
        assert!(studio.refresh_suggestion("A long enough text for advice").await.is_none());

        studio.shutdown().await.unwrap();
    }
}
