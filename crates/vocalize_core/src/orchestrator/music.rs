//! Background-music library and process-lifetime track cache.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::models::{BackgroundMusic, MusicSelection};

use super::collaborators::{CollaboratorResult, MusicSource};

/// A library track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MusicTrack {
    pub id: String,
    pub name: String,
    /// Mood label matched against advisor suggestions.
    pub mood: String,
    pub url: String,
}

impl MusicTrack {
    fn new(id: &str, name: &str, mood: &str, url: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            mood: mood.to_string(),
            url: url.to_string(),
        }
    }
}

/// Ordered set of tracks; the first one is the fallback.
#[derive(Debug, Clone)]
pub struct MusicLibrary {
    tracks: Vec<MusicTrack>,
}

impl Default for MusicLibrary {
    fn default() -> Self {
        Self::new(vec![
            MusicTrack::new(
                "track-1",
                "Ambient Focus",
                "Calm/Ambient",
                "https://www.soundhelix.com/examples/mp3/SoundHelix-Song-1.mp3",
            ),
            MusicTrack::new(
                "track-2",
                "Lofi Chill",
                "Relaxing",
                "https://www.soundhelix.com/examples/mp3/SoundHelix-Song-2.mp3",
            ),
            MusicTrack::new(
                "track-3",
                "Corporate Bright",
                "Corporate/Clean",
                "https://www.soundhelix.com/examples/mp3/SoundHelix-Song-3.mp3",
            ),
            MusicTrack::new(
                "track-4",
                "Midnight Shadows",
                "Dramatic/Suspenseful",
                "https://www.soundhelix.com/examples/mp3/SoundHelix-Song-8.mp3",
            ),
            MusicTrack::new(
                "track-5",
                "Sunrise Epic",
                "Inspirational",
                "https://www.soundhelix.com/examples/mp3/SoundHelix-Song-10.mp3",
            ),
        ])
    }
}

impl MusicLibrary {
    pub fn new(tracks: Vec<MusicTrack>) -> Self {
        Self { tracks }
    }

    pub fn tracks(&self) -> &[MusicTrack] {
        &self.tracks
    }

    pub fn get(&self, id: &str) -> Option<&MusicTrack> {
        self.tracks.iter().find(|t| t.id == id)
    }

    /// Pick the track to mix.
    ///
    /// With AI-composer mode on and a mood suggested, the first track whose
    /// mood equals it exactly wins, else the first library track. Otherwise
    /// the chosen track is played, or nothing if its id is unknown.
    pub fn select(&self, music: &BackgroundMusic, mood: Option<&str>) -> Option<&MusicTrack> {
        let mood = mood.filter(|m| !m.is_empty());
        match (&music.selection, mood) {
            (MusicSelection::AiComposer { .. }, Some(mood)) => self
                .tracks
                .iter()
                .find(|t| t.mood == mood)
                .or_else(|| self.tracks.first()),
            (selection, _) => self.get(selection.track_id()),
        }
    }
}

/// Fetches each track once and keeps its bytes for the process lifetime.
pub struct MusicCache {
    source: Arc<dyn MusicSource>,
    tracks: RwLock<HashMap<String, Arc<Vec<u8>>>>,
}

impl MusicCache {
    pub fn new(source: Arc<dyn MusicSource>) -> Self {
        Self {
            source,
            tracks: RwLock::new(HashMap::new()),
        }
    }

    /// Bytes for `track`, fetched on first use.
    pub async fn bytes(&self, track: &MusicTrack) -> CollaboratorResult<Arc<Vec<u8>>> {
        let cached = self.tracks.read().get(&track.id).cloned();
        if let Some(bytes) = cached {
            return Ok(bytes);
        }

        tracing::debug!(track = %track.id, "Fetching music track");
        let fetched = Arc::new(self.source.fetch_track(track).await?);

        let mut tracks = self.tracks.write();
        let bytes = tracks.entry(track.id.clone()).or_insert(fetched);
        Ok(Arc::clone(bytes))
    }

    pub fn is_cached(&self, track_id: &str) -> bool {
        self.tracks.read().contains_key(track_id)
    }

    pub fn len(&self) -> usize {
        self.tracks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.read().is_empty()
    }
}
