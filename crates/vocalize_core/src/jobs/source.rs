//! Task sources: manual entry, batch import, story scripts and schedules.
//!
//! The factory holds the operator's current voice, settings and naming
//! choices and stamps a snapshot of them onto every task it builds.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};

use crate::config::{ProductionSettings, QueueSettings};
use crate::models::{
    BackgroundMusic, CharacterVoice, Destinations, Language, MusicSelection, ScheduledJob,
    Suggestion, Task, VoicePreset, VoiceSettings,
};
use crate::orchestrator::{advise, TextAdvisor};

use super::naming::FileNamer;
use super::story::{parse_script, Narrator};

/// Voice name recorded on story tasks.
pub const STORY_VOICE_NAME: &str = "Story Engine";

/// Name given to scheduled jobs created without one.
const DEFAULT_JOB_NAME: &str = "Job";

/// Builds tasks from the current production settings.
#[derive(Debug, Clone)]
pub struct TaskFactory {
    namer: FileNamer,
    language: Language,
    voice_id: String,
    voice_name: String,
    settings: VoiceSettings,
    destinations: Destinations,
    music_volume: f32,
    music_track_id: String,
    suggestion: Option<Suggestion>,
}

impl TaskFactory {
    pub fn new(production: &ProductionSettings, queue: &QueueSettings) -> Self {
        Self {
            namer: FileNamer::new(queue.naming_convention, queue.custom_prefix.clone()),
            language: production.language,
            voice_id: production.voice_id.clone(),
            voice_name: production.voice_name.clone(),
            settings: production.voice.clone(),
            destinations: queue.default_destinations,
            music_volume: production.music_volume,
            music_track_id: production.music_track_id.clone(),
            suggestion: None,
        }
    }

    pub fn settings(&self) -> &VoiceSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut VoiceSettings {
        &mut self.settings
    }

    pub fn namer(&self) -> &FileNamer {
        &self.namer
    }

    pub fn set_namer(&mut self, namer: FileNamer) {
        self.namer = namer;
    }

    pub fn set_language(&mut self, language: Language) {
        self.language = language;
    }

    pub fn set_voice(&mut self, voice_id: impl Into<String>, voice_name: impl Into<String>) {
        self.voice_id = voice_id.into();
        self.voice_name = voice_name.into();
    }

    pub fn set_destinations(&mut self, destinations: Destinations) {
        self.destinations = destinations;
    }

    /// Switch background music on with the given selection, or off.
    ///
    /// A selection with an empty track id uses the configured default
    /// track. The current volume is kept when music was already on.
    pub fn set_music(&mut self, selection: Option<MusicSelection>) {
        let features = &mut self.settings.extra_features;
        let volume = features
            .background_music
            .as_ref()
            .map(BackgroundMusic::volume)
            .unwrap_or(self.music_volume);
        features.background_music = selection.map(|selection| {
            let default_track = self.music_track_id.clone();
            let selection = match selection {
                MusicSelection::Library { track_id } if track_id.is_empty() => {
                    MusicSelection::Library {
                        track_id: default_track,
                    }
                }
                MusicSelection::AiComposer { track_id } if track_id.is_empty() => {
                    MusicSelection::ai_composer(default_track)
                }
                other => other,
            };
            BackgroundMusic::new(selection, volume)
        });
    }

    /// Load a saved preset's voice and settings.
    pub fn apply_preset(&mut self, preset: &VoicePreset) {
        self.voice_id = preset.voice_id.clone();
        self.voice_name = preset.voice_name.clone();
        self.settings = preset.settings.clone();
        self.settings.model_id = preset.model_id.clone();
        tracing::debug!(preset = %preset.name, "Preset applied");
    }

    pub fn suggestion(&self) -> Option<&Suggestion> {
        self.suggestion.as_ref()
    }

    /// Adopt an advisor suggestion for the tasks built from now on.
    pub fn set_suggestion(&mut self, suggestion: Suggestion) {
        suggestion.apply_to(&mut self.settings, self.music_volume, &self.music_track_id);
        self.suggestion = Some(suggestion);
    }

    /// Drop the active suggestion and its mood.
    pub fn clear_suggestion(&mut self) {
        self.suggestion = None;
        self.settings.extra_features.suggested_mood = None;
    }

    /// Ask the advisor about `text` and adopt the answer.
    ///
    /// Keeps the previous suggestion when the text is too short or the
    /// advisor fails.
    pub async fn refresh_suggestion(
        &mut self,
        advisor: &dyn TextAdvisor,
        text: &str,
    ) -> Option<&Suggestion> {
        if let Some(suggestion) = advise(advisor, text).await {
            self.set_suggestion(suggestion);
        }
        self.suggestion.as_ref()
    }

    /// One task from manually entered text; nothing for blank text.
    pub fn manual(&self, text: &str) -> Option<Task> {
        if text.trim().is_empty() {
            return None;
        }
        let now = Utc::now();
        Some(self.build(text, None, now))
    }

    /// One task per distinct non-empty line of `content`.
    ///
    /// Rows keep file order: creation times are offset by the row index
    /// and row-index names are 1-based.
    pub fn batch(&self, content: &str) -> Vec<Task> {
        let mut seen = HashSet::new();
        let rows: Vec<&str> = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && seen.insert(*line))
            .collect();

        let base = Utc::now();
        let tasks: Vec<Task> = rows
            .iter()
            .enumerate()
            .map(|(i, line)| {
                let created_at = base + Duration::milliseconds(i as i64);
                self.build(line, Some(i + 1), created_at)
            })
            .collect();

        tracing::info!(rows = tasks.len(), "Batch import prepared");
        tasks
    }

    /// One story task voicing each script line with its character.
    ///
    /// Nothing is produced when the script yields no dialogue.
    pub fn story(&self, script: &str, cast: &[CharacterVoice]) -> Option<Task> {
        let narrator = Narrator {
            voice_id: self.voice_id.clone(),
            voice_name: self.voice_name.clone(),
        };
        let segments = parse_script(script, cast, &narrator);
        if segments.is_empty() {
            tracing::debug!("Script has no dialogue lines");
            return None;
        }

        let now = Utc::now();
        let mut task = self.build(script, None, now).with_segments(segments);
        task.voice_name = STORY_VOICE_NAME.to_string();
        task.file_name = self.namer.stitched_name_at(script, now);
        Some(task)
    }

    /// A one-task job that runs at `execute_at`.
    pub fn scheduled(
        &self,
        name: &str,
        text: &str,
        execute_at: DateTime<Utc>,
    ) -> Option<ScheduledJob> {
        let task = self.manual(text)?;
        let name = match name.trim() {
            "" => DEFAULT_JOB_NAME,
            trimmed => trimmed,
        };
        Some(ScheduledJob::new(name, vec![task], execute_at).with_notify(true))
    }

    fn build(&self, text: &str, row: Option<usize>, created_at: DateTime<Utc>) -> Task {
        let file_name = self.namer.name_at(text, row, created_at);
        Task::new(
            text,
            self.language,
            self.voice_id.clone(),
            self.voice_name.clone(),
            self.settings.clone(),
            file_name,
        )
        .with_destinations(self.destinations)
        .with_created_at(created_at)
    }
}
