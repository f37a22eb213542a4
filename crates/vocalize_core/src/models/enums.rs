//! Core enums used throughout the production queue.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a task in the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskStatus {
    /// Waiting for the driver.
    #[default]
    Pending,
    /// Claimed by the driver; at most one task at a time.
    Processing,
    /// Finished successfully (only seen on history items).
    Completed,
    /// Synthesis or post-processing failed; awaiting retry or discard.
    Failed,
}

impl TaskStatus {
    /// Get display string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Processing => "PROCESSING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Upload state of a remote destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UploadStatus {
    #[default]
    Idle,
    Uploading,
    Success,
    Error,
}

/// Target language of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Language {
    English,
    Bengali,
    /// Resolved from the text at task creation.
    #[default]
    #[serde(rename = "Auto-Detect")]
    Auto,
}

impl Language {
    /// Resolve `Auto` against the text; explicit languages pass through.
    pub fn resolve(self, text: &str) -> Language {
        match self {
            Language::Auto => {
                if text.chars().any(is_bengali) {
                    Language::Bengali
                } else {
                    Language::English
                }
            }
            other => other,
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Language::English => write!(f, "English"),
            Language::Bengali => write!(f, "Bengali"),
            Language::Auto => write!(f, "Auto-Detect"),
        }
    }
}

/// Whether a character belongs to the Bengali block (U+0980..=U+09FF).
pub fn is_bengali(c: char) -> bool {
    ('\u{0980}'..='\u{09FF}').contains(&c)
}

/// Named voice effect applied during post-processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VoiceEffect {
    #[default]
    None,
    Robotic,
    Echo,
    Whisper,
    Reverb,
    #[serde(rename = "Noise Reduction")]
    NoiseReduction,
}

impl std::fmt::Display for VoiceEffect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VoiceEffect::None => write!(f, "None"),
            VoiceEffect::Robotic => write!(f, "Robotic"),
            VoiceEffect::Echo => write!(f, "Echo"),
            VoiceEffect::Whisper => write!(f, "Whisper"),
            VoiceEffect::Reverb => write!(f, "Reverb"),
            VoiceEffect::NoiseReduction => write!(f, "Noise Reduction"),
        }
    }
}

/// Convention used to name output files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamingConvention {
    /// `Prod_<unix millis>`.
    #[default]
    Timestamp,
    /// Sanitized prefix of the text.
    TextPreview,
    /// Configured prefix followed by unix millis.
    CustomPrefix,
    /// `Row_<n>` for batch imports.
    RowIndex,
}

/// Delivery target for a finished artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    Local,
    CloudDrive,
    VideoPlatform,
}

impl Destination {
    /// Remote destinations, in delivery order.
    pub const REMOTE: [Destination; 2] = [Destination::CloudDrive, Destination::VideoPlatform];

    pub fn as_str(&self) -> &'static str {
        match self {
            Destination::Local => "local",
            Destination::CloudDrive => "cloud drive",
            Destination::VideoPlatform => "video platform",
        }
    }

    pub fn is_remote(&self) -> bool {
        !matches!(self, Destination::Local)
    }
}

impl std::fmt::Display for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
