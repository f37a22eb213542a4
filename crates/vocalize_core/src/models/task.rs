//! Task, dialogue segment and history structures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::{Destination, Language, TaskStatus, UploadStatus};
use super::voice::VoiceSettings;
use crate::logging::LogEntry;

/// One line of dialogue bound to a voice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogueSegment {
    pub id: String,
    /// Cast member id, or `narrator` when the speaker is not in the cast.
    pub character_id: String,
    pub voice_id: String,
    pub voice_name: String,
    pub text: String,
}

/// Destinations requested for a task. Local delivery always happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destinations {
    #[serde(default = "default_true")]
    pub local: bool,
    #[serde(default)]
    pub cloud_drive: bool,
    #[serde(default)]
    pub video_platform: bool,
}

fn default_true() -> bool {
    true
}

impl Default for Destinations {
    fn default() -> Self {
        Self {
            local: true,
            cloud_drive: false,
            video_platform: false,
        }
    }
}

impl Destinations {
    /// Whether a destination was requested.
    pub fn is_enabled(&self, destination: Destination) -> bool {
        match destination {
            Destination::Local => self.local,
            Destination::CloudDrive => self.cloud_drive,
            Destination::VideoPlatform => self.video_platform,
        }
    }

    /// Enabled remote destinations in delivery order.
    pub fn enabled_remote(&self) -> Vec<Destination> {
        Destination::REMOTE
            .into_iter()
            .filter(|d| self.is_enabled(*d))
            .collect()
    }
}

/// Upload state per remote destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UploadStatuses {
    #[serde(default)]
    pub cloud_drive: UploadStatus,
    #[serde(default)]
    pub video_platform: UploadStatus,
}

impl UploadStatuses {
    /// Status for a destination; local delivery has no upload state.
    pub fn get(&self, destination: Destination) -> Option<UploadStatus> {
        match destination {
            Destination::Local => None,
            Destination::CloudDrive => Some(self.cloud_drive),
            Destination::VideoPlatform => Some(self.video_platform),
        }
    }

    pub fn set(&mut self, destination: Destination, status: UploadStatus) {
        match destination {
            Destination::Local => {}
            Destination::CloudDrive => self.cloud_drive = status,
            Destination::VideoPlatform => self.video_platform = status,
        }
    }
}

/// The unit of work in the production queue.
///
/// Content fields are public; lifecycle fields are only written by
/// [`TaskQueue`](crate::jobs::TaskQueue).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub text: String,
    pub language: Language,
    pub voice_id: String,
    pub voice_name: String,
    pub settings: VoiceSettings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    segments: Option<Vec<DialogueSegment>>,
    pub destinations: Destinations,
    #[serde(default)]
    pub upload_statuses: UploadStatuses,
    pub file_name: String,

    pub(crate) status: TaskStatus,
    pub(crate) progress: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) estimated_remaining_secs: Option<u32>,
    #[serde(default)]
    pub(crate) retry_count: u32,
    #[serde(default)]
    pub(crate) log: Vec<LogEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) last_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) started_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Create a pending task. `language` is resolved against the text.
    pub fn new(
        text: impl Into<String>,
        language: Language,
        voice_id: impl Into<String>,
        voice_name: impl Into<String>,
        settings: VoiceSettings,
        file_name: impl Into<String>,
    ) -> Self {
        let text = text.into();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            language: language.resolve(&text),
            text,
            voice_id: voice_id.into(),
            voice_name: voice_name.into(),
            settings,
            segments: None,
            destinations: Destinations::default(),
            upload_statuses: UploadStatuses::default(),
            file_name: file_name.into(),
            status: TaskStatus::Pending,
            progress: 0,
            estimated_remaining_secs: None,
            retry_count: 0,
            log: Vec::new(),
            last_error: None,
            started_at: None,
        }
    }

    /// Attach story segments. The order is fixed from here on.
    pub fn with_segments(mut self, segments: Vec<DialogueSegment>) -> Self {
        self.settings.extra_features.story_mode = true;
        self.segments = Some(segments);
        self
    }

    pub fn with_destinations(mut self, destinations: Destinations) -> Self {
        self.destinations = destinations;
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Story segments in stitching order, if this is a story task.
    pub fn segments(&self) -> Option<&[DialogueSegment]> {
        self.segments.as_deref()
    }

    /// Whether synthesis runs per segment.
    pub fn is_story(&self) -> bool {
        self.settings.extra_features.story_mode
            && self.segments.as_ref().is_some_and(|s| !s.is_empty())
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn estimated_remaining_secs(&self) -> Option<u32> {
        self.estimated_remaining_secs
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn log(&self) -> &[LogEntry] {
        &self.log
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// Text used for duplicate detection.
    pub fn trimmed_text(&self) -> &str {
        self.text.trim()
    }

    pub fn character_count(&self) -> u64 {
        self.text.chars().count() as u64
    }

    pub fn word_count(&self) -> u64 {
        self.text.split_whitespace().count() as u64
    }
}

/// Where the finished artifacts ended up.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactLocators {
    /// Local path of the primary audio; `None` if local delivery failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<String>,
    /// Opaque ids returned by remote destinations.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub remote: Vec<RemoteReceipt>,
}

/// Id returned by a remote destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteReceipt {
    pub destination: Destination,
    pub remote_id: String,
}

/// A task frozen at successful completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryItem {
    #[serde(flatten)]
    pub task: Task,
    pub artifacts: ArtifactLocators,
    #[serde(default)]
    pub download_count: u32,
    pub last_used_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    #[serde(default)]
    pub processing_time_ms: u64,
}

impl HistoryItem {
    /// Freeze a task as completed.
    pub(crate) fn from_completed(
        mut task: Task,
        artifacts: ArtifactLocators,
        processing_time_ms: u64,
    ) -> Self {
        let now = Utc::now();
        task.status = TaskStatus::Completed;
        task.progress = 100;
        task.estimated_remaining_secs = None;
        Self {
            task,
            artifacts,
            download_count: 0,
            last_used_at: now,
            completed_at: now,
            processing_time_ms,
        }
    }

    pub fn id(&self) -> &str {
        &self.task.id
    }

    pub fn text(&self) -> &str {
        &self.task.text
    }
}
