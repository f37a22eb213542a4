//! Configuration management for the studio.
//!
//! This module provides:
//! - TOML-based configuration with logical sections
//! - Atomic file writes (write to temp, then rename)
//! - Section-level updates (only changed section is modified)
//! - Validation on load with automatic defaults
//!
//! # Example
//!
//! ```no_run
//! use vocalize_core::config::{ConfigManager, ConfigSection};
//!
//! let mut config = ConfigManager::new(".config/studio.toml");
//! config.load_or_create().unwrap();
//!
//! config.settings_mut().queue.skip_duplicates = false;
//! config.update_section(ConfigSection::Queue).unwrap();
//! ```

mod manager;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{
    ConfigSection, LoggingSettings, PathSettings, ProductionSettings, QueueSettings,
    SchedulerSettings, Settings,
};
