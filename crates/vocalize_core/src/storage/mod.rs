//! Persisted studio state.
//!
//! History, scheduled jobs, analytics counters and voice presets are each
//! stored as one JSON record under their own key. The live queue is never
//! persisted.

mod kv;
mod snapshots;

pub use kv::{JsonFileStore, KeyValueStore, MemoryStore};
pub use snapshots::{
    PresetStore, SnapshotStore, ANALYTICS_KEY, HISTORY_KEY, HISTORY_SNAPSHOT_LIMIT, PRESETS_KEY,
    SCHEDULED_JOBS_KEY,
};

use std::io;

use thiserror::Error;

/// Errors reading or writing persisted state.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage I/O failed for '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to serialize '{key}': {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Stored '{key}' is unreadable: {source}")]
    Deserialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

impl StorageError {
    pub fn io(key: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            key: key.into(),
            source,
        }
    }

    pub fn serialize(key: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Serialize {
            key: key.into(),
            source,
        }
    }

    pub fn deserialize(key: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Deserialize {
            key: key.into(),
            source,
        }
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
