//! Data models shared across the studio.

mod enums;
mod schedule;
mod task;
mod voice;

pub use enums::{
    is_bengali, Destination, Language, NamingConvention, TaskStatus, UploadStatus, VoiceEffect,
};
pub use schedule::{JobState, ScheduledJob};
pub use task::{
    ArtifactLocators, DialogueSegment, Destinations, HistoryItem, RemoteReceipt, Task,
    UploadStatuses,
};
pub use voice::{
    BackgroundMusic, CharacterVoice, ExtraFeatures, MusicSelection, Suggestion, VoicePreset,
    VoiceSettings, MAX_MUSIC_VOLUME,
};
