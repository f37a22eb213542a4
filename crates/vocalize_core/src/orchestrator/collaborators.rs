//! Capability contracts for the services the studio orchestrates.
//!
//! Speech synthesis, audio mastering, file transport, music hosting and
//! text analysis live outside this crate. The pipeline only sees these
//! traits and reacts to the success or failure they report; timeouts are
//! the implementor's responsibility.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Destination, Suggestion, VoiceEffect, VoiceSettings};

use super::music::MusicTrack;

/// Failure reported by an external collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollaboratorError {
    #[error("{service} rejected the request: {message}")]
    Rejected { service: String, message: String },

    #[error("{service} is unreachable: {message}")]
    Unavailable { service: String, message: String },

    #[error("{service} returned malformed data: {message}")]
    Malformed { service: String, message: String },

    #[error("{0} is not configured")]
    NotConfigured(String),
}

impl CollaboratorError {
    pub fn rejected(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rejected {
            service: service.into(),
            message: message.into(),
        }
    }

    pub fn unavailable(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unavailable {
            service: service.into(),
            message: message.into(),
        }
    }

    pub fn malformed(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Malformed {
            service: service.into(),
            message: message.into(),
        }
    }
}

/// Result type for collaborator calls.
pub type CollaboratorResult<T> = Result<T, CollaboratorError>;

/// Turns text into audio bytes.
///
/// Story segments are stitched as PCM, so for story tasks the returned
/// bytes must be WAV.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    async fn synthesize(
        &self,
        text: &str,
        voice_id: &str,
        settings: &VoiceSettings,
    ) -> CollaboratorResult<Vec<u8>>;
}

/// Music bed handed to the post-processor.
#[derive(Debug, Clone)]
pub struct MusicBed {
    pub track_id: String,
    pub bytes: Arc<Vec<u8>>,
    /// Mix volume in `[0, 0.5]`.
    pub volume: f32,
}

/// Transforms requested from the post-processor.
#[derive(Debug, Clone)]
pub struct PostProcessOptions {
    pub normalize: bool,
    pub trim_silence: bool,
    /// Seconds.
    pub max_clip_duration: u32,
    pub speed: f32,
    pub pitch: f32,
    pub effect: VoiceEffect,
    pub music: Option<MusicBed>,
    pub generate_subtitles: bool,
    pub generate_video: bool,
    /// Source text for subtitle and video generation.
    pub original_text: String,
}

impl PostProcessOptions {
    /// Options derived from a task's settings.
    pub fn from_settings(settings: &VoiceSettings, text: &str, music: Option<MusicBed>) -> Self {
        let features = &settings.extra_features;
        Self {
            normalize: settings.normalize,
            trim_silence: settings.trim_silence,
            max_clip_duration: settings.max_clip_duration,
            speed: settings.speed,
            pitch: settings.pitch,
            effect: features.voice_effect,
            music,
            generate_subtitles: features.generate_subtitles,
            generate_video: features.generate_video,
            original_text: text.to_string(),
        }
    }
}

/// Post-processor output.
#[derive(Debug, Clone, Default)]
pub struct ProcessedAudio {
    pub primary_audio: Vec<u8>,
    pub subtitle: Option<Vec<u8>>,
    pub video: Option<Vec<u8>>,
}

/// Masters synthesized audio and renders optional artifacts.
#[async_trait]
pub trait PostProcessor: Send + Sync {
    async fn process(
        &self,
        audio: Vec<u8>,
        options: &PostProcessOptions,
    ) -> CollaboratorResult<ProcessedAudio>;
}

/// Sends the primary audio to a remote destination.
#[async_trait]
pub trait Deliverer: Send + Sync {
    /// Returns an opaque id assigned by the destination.
    async fn deliver(
        &self,
        destination: Destination,
        audio: &[u8],
        file_name: &str,
    ) -> CollaboratorResult<String>;
}

/// Downloads library music tracks.
#[async_trait]
pub trait MusicSource: Send + Sync {
    async fn fetch_track(&self, track: &MusicTrack) -> CollaboratorResult<Vec<u8>>;
}

/// Suggests voice settings and a musical mood for a text.
#[async_trait]
pub trait TextAdvisor: Send + Sync {
    async fn optimize(&self, text: &str) -> CollaboratorResult<Suggestion>;
}

/// The external services one studio talks to.
///
/// Remote delivery and text analysis are optional; without a deliverer
/// every remote destination reports an error, without an advisor no
/// suggestions are made.
#[derive(Clone)]
pub struct Collaborators {
    pub synthesizer: Arc<dyn Synthesizer>,
    pub post_processor: Arc<dyn PostProcessor>,
    pub music_source: Arc<dyn MusicSource>,
    pub deliverer: Option<Arc<dyn Deliverer>>,
    pub advisor: Option<Arc<dyn TextAdvisor>>,
}

impl Collaborators {
    pub fn new(
        synthesizer: Arc<dyn Synthesizer>,
        post_processor: Arc<dyn PostProcessor>,
        music_source: Arc<dyn MusicSource>,
    ) -> Self {
        Self {
            synthesizer,
            post_processor,
            music_source,
            deliverer: None,
            advisor: None,
        }
    }

    pub fn with_deliverer(mut self, deliverer: Arc<dyn Deliverer>) -> Self {
        self.deliverer = Some(deliverer);
        self
    }

    pub fn with_advisor(mut self, advisor: Arc<dyn TextAdvisor>) -> Self {
        self.advisor = Some(advisor);
        self
    }
}

/// Texts at or below this many characters are not analyzed.
pub const ADVISOR_MIN_CHARS: usize = 15;

/// Ask the advisor about `text`.
///
/// Short texts are skipped and failures are logged; neither yields a
/// suggestion.
pub async fn advise(advisor: &dyn TextAdvisor, text: &str) -> Option<Suggestion> {
    if text.trim().chars().count() <= ADVISOR_MIN_CHARS {
        return None;
    }
    match advisor.optimize(text).await {
        Ok(suggestion) => {
            tracing::debug!(mood = %suggestion.mood, "Advisor suggestion received");
            Some(suggestion)
        }
        Err(e) => {
            tracing::warn!("Text analysis failed: {}", e);
            None
        }
    }
}
