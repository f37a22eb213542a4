//! In-memory collaborators shared by the orchestrator unit tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::logging::TaskLogger;
use crate::models::{DialogueSegment, Destination, Language, Task, VoiceSettings};

use super::audio::tests::wav;
use super::collaborators::{
    CollaboratorError, CollaboratorResult, Deliverer, MusicSource, PostProcessOptions,
    PostProcessor, ProcessedAudio, Synthesizer,
};
use super::music::MusicTrack;
use super::types::ProductionContext;

pub(crate) fn task(text: &str) -> Task {
    Task::new(text, Language::English, "v1", "Rachel", VoiceSettings::default(), "Prod_1.mp3")
}

/// Story task with one segment per `(voice_id, text)` pair.
pub(crate) fn story_task(lines: &[(&str, &str)]) -> Task {
    let segments = lines
        .iter()
        .enumerate()
        .map(|(i, (voice, text))| DialogueSegment {
            id: format!("seg-{}", i),
            character_id: voice.to_string(),
            voice_id: voice.to_string(),
            voice_name: voice.to_uppercase(),
            text: text.to_string(),
        })
        .collect();
    let script = lines
        .iter()
        .map(|(voice, text)| format!("{}: {}", voice, text))
        .collect::<Vec<_>>()
        .join("\n");
    task(&script).with_segments(segments)
}

pub(crate) fn context(task: Task) -> ProductionContext {
    let logger = Arc::new(TaskLogger::detached(task.id.clone(), None));
    ProductionContext::new(task, logger)
}

/// Returns a mono WAV with one sample per text byte.
#[derive(Default)]
pub(crate) struct FakeSynthesizer {
    calls: Mutex<Vec<(String, String)>>,
    fail_on: Option<String>,
}

impl FakeSynthesizer {
    pub(crate) fn failing_on(text: &str) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_on: Some(text.to_string()),
        }
    }

    pub(crate) fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl Synthesizer for FakeSynthesizer {
    async fn synthesize(
        &self,
        text: &str,
        voice_id: &str,
        _settings: &VoiceSettings,
    ) -> CollaboratorResult<Vec<u8>> {
        self.calls
            .lock()
            .push((voice_id.to_string(), text.to_string()));
        if self.fail_on.as_deref() == Some(text) {
            return Err(CollaboratorError::rejected("synthesis", "voice unavailable"));
        }
        let samples: Vec<i16> = text.bytes().map(i16::from).collect();
        Ok(wav(16000, &samples))
    }
}

/// Passes audio through and records the options it saw.
#[derive(Default)]
pub(crate) struct FakeProcessor {
    seen: Mutex<Vec<PostProcessOptions>>,
    fail: bool,
    empty: bool,
}

impl FakeProcessor {
    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub(crate) fn returning_empty() -> Self {
        Self {
            empty: true,
            ..Default::default()
        }
    }

    pub(crate) fn last_options(&self) -> Option<PostProcessOptions> {
        self.seen.lock().last().cloned()
    }
}

#[async_trait]
impl PostProcessor for FakeProcessor {
    async fn process(
        &self,
        audio: Vec<u8>,
        options: &PostProcessOptions,
    ) -> CollaboratorResult<ProcessedAudio> {
        self.seen.lock().push(options.clone());
        if self.fail {
            return Err(CollaboratorError::malformed("mastering", "unreadable input"));
        }
        if self.empty {
            return Ok(ProcessedAudio::default());
        }
        Ok(ProcessedAudio {
            primary_audio: audio,
            subtitle: options
                .generate_subtitles
                .then(|| options.original_text.as_bytes().to_vec()),
            video: None,
        })
    }
}

/// Succeeds for every destination not listed as failing.
#[derive(Default)]
pub(crate) struct FakeDeliverer {
    failing: HashSet<Destination>,
    attempts: AtomicUsize,
}

impl FakeDeliverer {
    pub(crate) fn failing(destinations: &[Destination]) -> Self {
        Self {
            failing: destinations.iter().copied().collect(),
            attempts: AtomicUsize::new(0),
        }
    }

    pub(crate) fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Deliverer for FakeDeliverer {
    async fn deliver(
        &self,
        destination: Destination,
        _audio: &[u8],
        file_name: &str,
    ) -> CollaboratorResult<String> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(&destination) {
            return Err(CollaboratorError::unavailable(destination.as_str(), "timed out"));
        }
        Ok(format!("{}:{}", destination.as_str(), file_name))
    }
}

pub(crate) struct StaticMusic;

#[async_trait]
impl MusicSource for StaticMusic {
    async fn fetch_track(&self, track: &MusicTrack) -> CollaboratorResult<Vec<u8>> {
        Ok(track.id.as_bytes().to_vec())
    }
}
