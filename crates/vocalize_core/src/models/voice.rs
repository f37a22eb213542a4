//! Voice and production settings snapshotted onto every task.

use serde::{Deserialize, Serialize};

use super::enums::{Language, VoiceEffect};

/// Upper bound for the background-music mixing volume.
pub const MAX_MUSIC_VOLUME: f32 = 0.5;

/// Synthesis and post-processing settings for one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceSettings {
    #[serde(default = "default_stability")]
    pub stability: f32,
    #[serde(default = "default_similarity")]
    pub similarity_boost: f32,
    #[serde(default)]
    pub style: f32,
    #[serde(default = "default_true")]
    pub use_speaker_boost: bool,
    #[serde(default = "default_unit")]
    pub speed: f32,
    #[serde(default = "default_unit")]
    pub pitch: f32,
    /// Loudness normalization.
    #[serde(default = "default_true")]
    pub normalize: bool,
    #[serde(default = "default_true")]
    pub trim_silence: bool,
    /// Longest clip the post-processor may emit, in seconds.
    #[serde(default = "default_max_clip")]
    pub max_clip_duration: u32,
    #[serde(default = "default_model")]
    pub model_id: String,
    #[serde(default)]
    pub extra_features: ExtraFeatures,
}

fn default_stability() -> f32 {
    0.5
}

fn default_similarity() -> f32 {
    0.75
}

fn default_unit() -> f32 {
    1.0
}

fn default_true() -> bool {
    true
}

fn default_max_clip() -> u32 {
    60
}

fn default_model() -> String {
    "eleven_multilingual_v2".to_string()
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            stability: default_stability(),
            similarity_boost: default_similarity(),
            style: 0.0,
            use_speaker_boost: true,
            speed: default_unit(),
            pitch: default_unit(),
            normalize: true,
            trim_silence: true,
            max_clip_duration: default_max_clip(),
            model_id: default_model(),
            extra_features: ExtraFeatures::default(),
        }
    }
}

/// Optional production features toggled per task.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExtraFeatures {
    #[serde(default)]
    pub generate_subtitles: bool,
    #[serde(default)]
    pub generate_video: bool,
    #[serde(default)]
    pub voice_effect: VoiceEffect,
    /// Mood predicted by the text advisor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_mood: Option<String>,
    #[serde(default)]
    pub story_mode: bool,
    /// Music bed mixed under the voice; `None` disables mixing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_music: Option<BackgroundMusic>,
}

/// Background-music configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackgroundMusic {
    volume: f32,
    pub selection: MusicSelection,
}

impl BackgroundMusic {
    pub fn new(selection: MusicSelection, volume: f32) -> Self {
        Self {
            selection,
            volume: clamp_volume(volume),
        }
    }

    /// Mix volume, always within `[0, MAX_MUSIC_VOLUME]`.
    pub fn volume(&self) -> f32 {
        clamp_volume(self.volume)
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.volume = clamp_volume(volume);
    }
}

fn clamp_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        return 0.0;
    }
    volume.clamp(0.0, MAX_MUSIC_VOLUME)
}

/// How the music track is chosen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum MusicSelection {
    /// Explicit library track.
    Library { track_id: String },
    /// Track matched from the suggested mood; `track_id` is played when no
    /// mood was suggested.
    AiComposer {
        #[serde(default)]
        track_id: String,
    },
}

impl MusicSelection {
    pub fn ai_composer(track_id: impl Into<String>) -> Self {
        Self::AiComposer {
            track_id: track_id.into(),
        }
    }

    /// The explicitly chosen track.
    pub fn track_id(&self) -> &str {
        match self {
            Self::Library { track_id } | Self::AiComposer { track_id } => track_id,
        }
    }
}

/// A named character bound to a voice in story mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterVoice {
    pub id: String,
    pub name: String,
    pub voice_id: String,
    pub voice_name: String,
}

impl CharacterVoice {
    pub fn new(
        name: impl Into<String>,
        voice_id: impl Into<String>,
        voice_name: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            voice_id: voice_id.into(),
            voice_name: voice_name.into(),
        }
    }
}

/// A saved voice + settings combination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoicePreset {
    pub id: String,
    pub name: String,
    pub voice_id: String,
    pub voice_name: String,
    pub model_id: String,
    pub settings: VoiceSettings,
}

impl VoicePreset {
    pub fn new(
        name: impl Into<String>,
        voice_id: impl Into<String>,
        voice_name: impl Into<String>,
        settings: VoiceSettings,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            voice_id: voice_id.into(),
            voice_name: voice_name.into(),
            model_id: settings.model_id.clone(),
            settings,
        }
    }
}

/// Advisory settings returned by the text advisor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    /// Detected language, if the advisor reported one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<Language>,
    pub stability: f32,
    pub similarity: f32,
    pub speed: f32,
    pub pitch: f32,
    pub mood: String,
    #[serde(default)]
    pub reasoning: String,
}

impl Suggestion {
    /// Adopt the suggested voice parameters and switch music to
    /// AI-composer mode. An existing music volume and track are kept.
    pub fn apply_to(&self, settings: &mut VoiceSettings, default_volume: f32, default_track: &str) {
        settings.stability = self.stability;
        settings.similarity_boost = self.similarity;
        settings.speed = self.speed;
        settings.pitch = self.pitch;

        let features = &mut settings.extra_features;
        let (volume, track_id) = match features.background_music.as_ref() {
            Some(music) if !music.selection.track_id().is_empty() => {
                (music.volume(), music.selection.track_id().to_string())
            }
            Some(music) => (music.volume(), default_track.to_string()),
            None => (default_volume, default_track.to_string()),
        };
        features.background_music = Some(BackgroundMusic::new(
            MusicSelection::ai_composer(track_id),
            volume,
        ));
        features.suggested_mood = Some(self.mood.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn music_volume_is_clamped() {
        let music = BackgroundMusic::new(MusicSelection::ai_composer("track-1"), 0.9);
        assert_eq!(music.volume(), MAX_MUSIC_VOLUME);

        let mut music = BackgroundMusic::new(MusicSelection::ai_composer("track-1"), -1.0);
        assert_eq!(music.volume(), 0.0);
        music.set_volume(0.2);
        assert!((music.volume() - 0.2).abs() < f32::EPSILON);
    }

    #[test]
    fn deserialized_volume_is_clamped_on_read() {
        let json = r#"{"selection":{"mode":"ai_composer"},"volume":3.0}"#;
        let music: BackgroundMusic = serde_json::from_str(json).unwrap();
        assert_eq!(music.volume(), MAX_MUSIC_VOLUME);
        assert_eq!(music.selection.track_id(), "");
    }

    #[test]
    fn missing_fields_use_defaults() {
        let settings: VoiceSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, VoiceSettings::default());
        assert_eq!(settings.model_id, "eleven_multilingual_v2");
        assert!(settings.extra_features.background_music.is_none());
    }

    #[test]
    fn preset_copies_model_from_settings() {
        let mut settings = VoiceSettings::default();
        settings.model_id = "eleven_turbo_v2_5".to_string();
        let preset = VoicePreset::new("Narration", "v1", "Rachel", settings);
        assert_eq!(preset.model_id, "eleven_turbo_v2_5");
    }

    #[test]
    fn suggestion_switches_to_ai_composer() {
        let suggestion = Suggestion {
            language: Some(Language::English),
            stability: 0.3,
            similarity: 0.9,
            speed: 1.1,
            pitch: 0.95,
            mood: "Inspirational".to_string(),
            reasoning: String::new(),
        };
        let mut settings = VoiceSettings::default();
        suggestion.apply_to(&mut settings, 0.1, "track-1");

        assert_eq!(settings.stability, 0.3);
        assert_eq!(settings.similarity_boost, 0.9);
        let music = settings.extra_features.background_music.clone().unwrap();
        assert_eq!(music.selection, MusicSelection::ai_composer("track-1"));
        assert!((music.volume() - 0.1).abs() < f32::EPSILON);
        assert_eq!(settings.extra_features.suggested_mood.as_deref(), Some("Inspirational"));
    }

    #[test]
    fn suggestion_keeps_chosen_library_track() {
        let suggestion = Suggestion {
            language: None,
            stability: 0.5,
            similarity: 0.5,
            speed: 1.0,
            pitch: 1.0,
            mood: "Calm".to_string(),
            reasoning: String::new(),
        };
        let mut settings = VoiceSettings::default();
        settings.extra_features.background_music = Some(BackgroundMusic::new(
            MusicSelection::Library {
                track_id: "track-3".to_string(),
            },
            0.3,
        ));

        suggestion.apply_to(&mut settings, 0.1, "track-1");

        let music = settings.extra_features.background_music.unwrap();
        assert_eq!(music.selection, MusicSelection::ai_composer("track-3"));
        assert!((music.volume() - 0.3).abs() < f32::EPSILON);
    }
}
