//! Deferred bundles of tasks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::task::Task;

/// Lifecycle state of a scheduled job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobState {
    #[default]
    Pending,
    Executed,
    Cancelled,
}

/// A named bundle of tasks injected into the queue once `execute_at` passes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledJob {
    pub id: String,
    pub name: String,
    pub tasks: Vec<Task>,
    pub execute_at: DateTime<Utc>,
    pub(crate) state: JobState,
    /// Reported with the materialization event.
    #[serde(default)]
    pub notify_on_completion: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) executed_at: Option<DateTime<Utc>>,
}

impl ScheduledJob {
    pub fn new(name: impl Into<String>, tasks: Vec<Task>, execute_at: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            tasks,
            execute_at,
            state: JobState::Pending,
            notify_on_completion: false,
            executed_at: None,
        }
    }

    pub fn with_notify(mut self, notify: bool) -> Self {
        self.notify_on_completion = notify;
        self
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn executed_at(&self) -> Option<DateTime<Utc>> {
        self.executed_at
    }

    /// Pending and past its execution instant.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.state == JobState::Pending && self.execute_at <= now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn due_only_when_pending_and_elapsed() {
        let now = Utc::now();
        let mut job = ScheduledJob::new("Morning batch", Vec::new(), now + Duration::hours(1));
        assert!(!job.is_due(now));
        assert!(job.is_due(now + Duration::hours(2)));

        job.state = JobState::Cancelled;
        assert!(!job.is_due(now + Duration::hours(2)));
    }

    #[test]
    fn state_serializes_uppercase() {
        let json = serde_json::to_string(&JobState::Executed).unwrap();
        assert_eq!(json, "\"EXECUTED\"");
    }
}
