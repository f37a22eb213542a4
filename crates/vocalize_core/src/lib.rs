//! Vocalize Core - production queue for text-to-speech jobs
//!
//! This crate contains the task state machine, the production pipeline
//! driver, the scheduler and analytics with zero UI dependencies. Speech
//! synthesis, mastering, music and delivery are supplied by the caller
//! through the collaborator traits in [`orchestrator`].

pub mod analytics;
pub mod config;
pub mod jobs;
pub mod logging;
pub mod models;
pub mod orchestrator;
pub mod runtime;
pub mod scheduler;
pub mod storage;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_returns_value() {
        assert!(!version().is_empty());
    }
}
