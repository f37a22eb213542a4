//! Typed snapshots of studio state on top of a key-value store.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::analytics::AnalyticsData;
use crate::models::{HistoryItem, ScheduledJob, VoicePreset};

use super::kv::KeyValueStore;
use super::{StorageError, StorageResult};

pub const HISTORY_KEY: &str = "history";
pub const SCHEDULED_JOBS_KEY: &str = "scheduled_jobs";
pub const ANALYTICS_KEY: &str = "analytics";
pub const PRESETS_KEY: &str = "presets";

/// Most history items kept in a snapshot.
pub const HISTORY_SNAPSHOT_LIMIT: usize = 1000;

/// Reads and writes each persisted surface under its own key.
#[derive(Clone)]
pub struct SnapshotStore {
    store: Arc<dyn KeyValueStore>,
}

impl SnapshotStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Saved history, newest first.
    pub fn load_history(&self) -> StorageResult<Vec<HistoryItem>> {
        Ok(self.load(HISTORY_KEY)?.unwrap_or_default())
    }

    /// Save history, keeping only the newest entries.
    pub fn save_history(&self, items: &[HistoryItem]) -> StorageResult<()> {
        let kept = &items[..items.len().min(HISTORY_SNAPSHOT_LIMIT)];
        self.save(HISTORY_KEY, &kept)
    }

    pub fn load_jobs(&self) -> StorageResult<Vec<ScheduledJob>> {
        Ok(self.load(SCHEDULED_JOBS_KEY)?.unwrap_or_default())
    }

    pub fn save_jobs(&self, jobs: &[ScheduledJob]) -> StorageResult<()> {
        self.save(SCHEDULED_JOBS_KEY, &jobs)
    }

    pub fn load_analytics(&self) -> StorageResult<AnalyticsData> {
        Ok(self.load(ANALYTICS_KEY)?.unwrap_or_default())
    }

    pub fn save_analytics(&self, data: &AnalyticsData) -> StorageResult<()> {
        self.save(ANALYTICS_KEY, data)
    }

    fn load<T: DeserializeOwned>(&self, key: &str) -> StorageResult<Option<T>> {
        match self.store.get(key)? {
            Some(json) => serde_json::from_str(&json)
                .map(Some)
                .map_err(|e| StorageError::deserialize(key, e)),
            None => Ok(None),
        }
    }

    fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> StorageResult<()> {
        let json =
            serde_json::to_string_pretty(value).map_err(|e| StorageError::serialize(key, e))?;
        self.store.put(key, &json)
    }
}

/// Saved voice presets, kept in memory and written through on change.
pub struct PresetStore {
    store: Arc<dyn KeyValueStore>,
    presets: Vec<VoicePreset>,
}

impl PresetStore {
    /// Load existing presets from `store`.
    pub fn load(store: Arc<dyn KeyValueStore>) -> StorageResult<Self> {
        let presets = match store.get(PRESETS_KEY)? {
            Some(json) => serde_json::from_str(&json)
                .map_err(|e| StorageError::deserialize(PRESETS_KEY, e))?,
            None => Vec::new(),
        };
        Ok(Self { store, presets })
    }

    pub fn presets(&self) -> &[VoicePreset] {
        &self.presets
    }

    pub fn get(&self, id: &str) -> Option<&VoicePreset> {
        self.presets.iter().find(|p| p.id == id)
    }

    /// Add a preset, replacing one with the same id.
    pub fn save(&mut self, preset: VoicePreset) -> StorageResult<()> {
        match self.presets.iter_mut().find(|p| p.id == preset.id) {
            Some(existing) => *existing = preset,
            None => self.presets.push(preset),
        }
        self.persist()
    }

    /// Remove a preset. Returns false if the id was unknown.
    pub fn delete(&mut self, id: &str) -> StorageResult<bool> {
        let before = self.presets.len();
        self.presets.retain(|p| p.id != id);
        if self.presets.len() == before {
            return Ok(false);
        }
        self.persist()?;
        Ok(true)
    }

    fn persist(&self) -> StorageResult<()> {
        let json = serde_json::to_string_pretty(&self.presets)
            .map_err(|e| StorageError::serialize(PRESETS_KEY, e))?;
        self.store.put(PRESETS_KEY, &json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::Outcome;
    use crate::models::{Language, Task, VoiceSettings};
    use crate::storage::MemoryStore;

    fn store() -> (Arc<MemoryStore>, SnapshotStore) {
        let memory = Arc::new(MemoryStore::new());
        (memory.clone(), SnapshotStore::new(memory))
    }

    fn history_item(text: &str) -> HistoryItem {
        let task = Task::new(text, Language::English, "v", "V", VoiceSettings::default(), "a.mp3");
        HistoryItem::from_completed(task, Default::default(), 10)
    }

    #[test]
    fn missing_keys_load_as_empty() {
        let (_, snapshots) = store();
        assert!(snapshots.load_history().unwrap().is_empty());
        assert!(snapshots.load_jobs().unwrap().is_empty());
        assert_eq!(snapshots.load_analytics().unwrap(), AnalyticsData::default());
    }

    #[test]
    fn history_snapshot_is_bounded() {
        let (_, snapshots) = store();
        let items: Vec<HistoryItem> = (0..HISTORY_SNAPSHOT_LIMIT + 5)
            .map(|i| history_item(&format!("text {}", i)))
            .collect();

        snapshots.save_history(&items).unwrap();
        let loaded = snapshots.load_history().unwrap();

        assert_eq!(loaded.len(), HISTORY_SNAPSHOT_LIMIT);
        assert_eq!(loaded[0].text(), "text 0");
    }

    #[test]
    fn analytics_snapshot_round_trips() {
        let (_, snapshots) = store();
        let mut data = AnalyticsData::default();
        data.record(Outcome {
            success: true,
            characters: 12,
            words: 2,
            processing_time_ms: 400,
        });

        snapshots.save_analytics(&data).unwrap();
        assert_eq!(snapshots.load_analytics().unwrap(), data);
    }

    #[test]
    fn corrupt_snapshot_is_an_error() {
        let (memory, snapshots) = store();
        memory.put(HISTORY_KEY, "{not json").unwrap();
        let err = snapshots.load_history().unwrap_err();
        assert!(err.to_string().contains("history"));
    }

    #[test]
    fn presets_save_replace_and_delete() {
        let memory: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let mut presets = PresetStore::load(memory.clone()).unwrap();
        let mut preset = VoicePreset::new("Warm", "v1", "Rachel", VoiceSettings::default());
        presets.save(preset.clone()).unwrap();

        preset.name = "Warmer".to_string();
        presets.save(preset.clone()).unwrap();
        assert_eq!(presets.presets().len(), 1);

        let reloaded = PresetStore::load(memory.clone()).unwrap();
        assert_eq!(reloaded.get(&preset.id).unwrap().name, "Warmer");

        assert!(presets.delete(&preset.id).unwrap());
        assert!(!presets.delete(&preset.id).unwrap());
        assert!(PresetStore::load(memory).unwrap().presets().is_empty());
    }
}
