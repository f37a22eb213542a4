//! Production queue and task sources.
//!
//! This module provides:
//! - `TaskQueue`: the task state machine, duplicate policy and history
//! - `QueueHandle`: shared access that wakes the driver on new work
//! - `TaskFactory`: builds tasks from text, batch files, scripts and schedules
//! - `FileNamer`: output filenames under the active naming convention
//! - `parse_script`: multi-character script parsing

mod naming;
mod queue;
mod source;
mod story;

pub use naming::{FileNamer, PREVIEW_LEN, STITCHED_EXTENSION};
pub use queue::{
    DiscardOutcome, EnqueueOutcome, QueueError, QueueHandle, QueuePolicy, QueueResult,
    QueueStats, TaskQueue, CLAIM_PROGRESS,
};
pub use source::{TaskFactory, STORY_VOICE_NAME};
pub use story::{parse_script, Narrator, NARRATOR_ID};
