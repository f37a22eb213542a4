//! Settings struct with TOML-based sections.
//!
//! Settings are organized into logical sections that map to TOML tables.
//! Each section can be updated independently for atomic section-level updates.

use serde::{Deserialize, Serialize};

use crate::logging::{LogConfig, LogLevel};
use crate::models::{Destinations, Language, NamingConvention, VoiceSettings};

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Path-related settings.
    #[serde(default)]
    pub paths: PathSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSettings,

    /// Queue policy.
    #[serde(default)]
    pub queue: QueueSettings,

    /// Defaults applied to new tasks.
    #[serde(default)]
    pub production: ProductionSettings,

    /// Timer intervals.
    #[serde(default)]
    pub scheduler: SchedulerSettings,
}

/// Path configuration for snapshots, artifacts, and logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    /// Folder holding the key-value snapshots.
    #[serde(default = "default_data_folder")]
    pub data_folder: String,

    /// Folder receiving locally delivered artifacts.
    #[serde(default = "default_output_folder")]
    pub output_folder: String,

    /// Folder for log files.
    #[serde(default = "default_logs_folder")]
    pub logs_folder: String,
}

fn default_data_folder() -> String {
    ".data".to_string()
}

fn default_output_folder() -> String {
    "productions".to_string()
}

fn default_logs_folder() -> String {
    ".logs".to_string()
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            data_folder: default_data_folder(),
            output_folder: default_output_folder(),
            logs_folder: default_logs_folder(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Process-wide level; `RUST_LOG` takes precedence.
    #[serde(default)]
    pub level: LogLevel,

    /// Write one log file per task.
    #[serde(default)]
    pub task_log_files: bool,

    /// Progress update step percentage.
    #[serde(default = "default_progress_step")]
    pub progress_step: u32,
}

fn default_true() -> bool {
    true
}

fn default_progress_step() -> u32 {
    20
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            task_log_files: false,
            progress_step: default_progress_step(),
        }
    }
}

impl LoggingSettings {
    /// Per-task logger configuration.
    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            task_log_files: self.task_log_files,
            progress_step: self.progress_step,
        }
    }
}

/// Queue policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueSettings {
    /// Reject text already queued or in history.
    #[serde(default = "default_true")]
    pub skip_duplicates: bool,

    #[serde(default)]
    pub naming_convention: NamingConvention,

    /// Prefix for the custom-prefix naming convention.
    #[serde(default = "default_custom_prefix")]
    pub custom_prefix: String,

    /// Retry cap; absent means unbounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,

    /// Number of history items kept, newest first.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Destinations requested for new tasks.
    #[serde(default)]
    pub default_destinations: Destinations,
}

fn default_custom_prefix() -> String {
    "Vocalize_".to_string()
}

fn default_history_limit() -> usize {
    1000
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            skip_duplicates: true,
            naming_convention: NamingConvention::default(),
            custom_prefix: default_custom_prefix(),
            max_retries: None,
            history_limit: default_history_limit(),
            default_destinations: Destinations::default(),
        }
    }
}

/// Defaults stamped onto new tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductionSettings {
    #[serde(default)]
    pub language: Language,

    #[serde(default = "default_voice_id")]
    pub voice_id: String,

    #[serde(default = "default_voice_name")]
    pub voice_name: String,

    /// Volume used when background music is switched on.
    #[serde(default = "default_music_volume")]
    pub music_volume: f32,

    /// Library track used when background music is switched on.
    #[serde(default = "default_music_track")]
    pub music_track_id: String,

    #[serde(default)]
    pub voice: VoiceSettings,
}

fn default_voice_id() -> String {
    "21m00Tcm4TlvDq8ikWAM".to_string()
}

fn default_voice_name() -> String {
    "Default".to_string()
}

fn default_music_volume() -> f32 {
    0.1
}

fn default_music_track() -> String {
    "track-1".to_string()
}

impl Default for ProductionSettings {
    fn default() -> Self {
        Self {
            language: Language::Auto,
            voice_id: default_voice_id(),
            voice_name: default_voice_name(),
            music_volume: default_music_volume(),
            music_track_id: default_music_track(),
            voice: VoiceSettings::default(),
        }
    }
}

/// Timer intervals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerSettings {
    /// How often due scheduled jobs are checked.
    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,

    /// How often persistent state is snapshotted.
    #[serde(default = "default_snapshot_interval")]
    pub snapshot_interval_secs: u64,
}

fn default_check_interval() -> u64 {
    60
}

fn default_snapshot_interval() -> u64 {
    30
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            check_interval_secs: default_check_interval(),
            snapshot_interval_secs: default_snapshot_interval(),
        }
    }
}

/// Names of config sections for targeted updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigSection {
    Paths,
    Logging,
    Queue,
    Production,
    Scheduler,
}

impl ConfigSection {
    pub const ALL: [ConfigSection; 5] = [
        ConfigSection::Paths,
        ConfigSection::Logging,
        ConfigSection::Queue,
        ConfigSection::Production,
        ConfigSection::Scheduler,
    ];

    /// Get the TOML table name for this section.
    pub fn table_name(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "paths",
            ConfigSection::Logging => "logging",
            ConfigSection::Queue => "queue",
            ConfigSection::Production => "production",
            ConfigSection::Scheduler => "scheduler",
        }
    }

    /// Comment written above the table.
    pub fn description(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "Snapshot, artifact and log directories",
            ConfigSection::Logging => "Logging configuration",
            ConfigSection::Queue => "Duplicate, naming and retry policy",
            ConfigSection::Production => "Defaults applied to new tasks",
            ConfigSection::Scheduler => "Scheduled-job check and snapshot intervals",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_serializes() {
        let settings = Settings::default();
        let toml = toml::to_string_pretty(&settings).unwrap();
        assert!(toml.contains("[paths]"));
        assert!(toml.contains("[queue]"));
        assert!(toml.contains("skip_duplicates = true"));
    }

    #[test]
    fn settings_round_trip() {
        let settings = Settings::default();
        let toml = toml::to_string_pretty(&settings).unwrap();
        let parsed: Settings = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.paths.output_folder, settings.paths.output_folder);
        assert_eq!(parsed.queue.history_limit, 1000);
        assert_eq!(parsed.production.voice, settings.production.voice);
        assert!(parsed.queue.max_retries.is_none());
    }

    #[test]
    fn missing_fields_use_defaults() {
        let minimal = "[queue]\ncustom_prefix = \"Ep_\"\nmax_retries = 3";
        let parsed: Settings = toml::from_str(minimal).unwrap();
        assert_eq!(parsed.queue.custom_prefix, "Ep_");
        assert_eq!(parsed.queue.max_retries, Some(3));
        assert!(parsed.queue.skip_duplicates);
        assert_eq!(parsed.queue.naming_convention, NamingConvention::Timestamp);
        assert_eq!(parsed.scheduler.check_interval_secs, 60);
        assert_eq!(parsed.production.music_track_id, "track-1");
    }

    #[test]
    fn naming_convention_parses_snake_case() {
        let parsed: Settings =
            toml::from_str("[queue]\nnaming_convention = \"text_preview\"").unwrap();
        assert_eq!(parsed.queue.naming_convention, NamingConvention::TextPreview);
    }
}
