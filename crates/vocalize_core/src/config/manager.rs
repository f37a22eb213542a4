//! Studio config file handling.
//!
//! The file is always replaced through a sibling `.toml.tmp`, so a crash
//! mid-write leaves the previous version intact. Section updates go
//! through `toml_edit` and leave the other tables (and their comments)
//! as they are on disk.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use toml_edit::{DocumentMut, Item};

use super::settings::{ConfigSection, Settings};

const FILE_HEADER: &str = "# Vocalize Studio Configuration\n\
# Written by the studio. Section updates keep comments in other sections.\n";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid config values: {0}")]
    Invalid(#[from] toml::de::Error),

    #[error("Could not encode settings: {0}")]
    Encode(#[from] toml::ser::Error),

    #[error("Config is not valid TOML: {0}")]
    Syntax(#[from] toml_edit::TomlError),

    #[error("No config at {0}")]
    NotFound(PathBuf),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Owns the settings and the file they came from.
pub struct ConfigManager {
    config_path: PathBuf,
    settings: Settings,
}

impl ConfigManager {
    /// Starts with default settings; nothing is read until `load` or
    /// `load_or_create`.
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            settings: Settings::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// In-memory only until `save` or `update_section`.
    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    /// Read an existing file.
    pub fn load(&mut self) -> ConfigResult<()> {
        let content = self.read_existing()?;
        self.settings = toml::from_str(&content)?;
        Ok(())
    }

    /// Read the file, or write defaults when there is none.
    ///
    /// A file with missing or unknown keys is normalized and written back.
    pub fn load_or_create(&mut self) -> ConfigResult<()> {
        if !self.config_path.exists() {
            tracing::info!(path = %self.config_path.display(), "Creating default config");
            self.settings = Settings::default();
            return self.save();
        }

        let content = self.read_existing()?;
        let (settings, normalized) = parse_normalized(&content)?;
        self.settings = settings;
        if normalized {
            tracing::info!(path = %self.config_path.display(), "Normalizing config file");
            self.save()?;
        }
        Ok(())
    }

    /// Create the data, output and logs folders.
    pub fn ensure_dirs_exist(&self) -> ConfigResult<()> {
        let paths = &self.settings.paths;
        for dir in [&paths.data_folder, &paths.output_folder, &paths.logs_folder] {
            fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    pub fn data_folder(&self) -> PathBuf {
        self.settings.paths.data_folder.clone().into()
    }

    pub fn output_folder(&self) -> PathBuf {
        self.settings.paths.output_folder.clone().into()
    }

    pub fn logs_folder(&self) -> PathBuf {
        self.settings.paths.logs_folder.clone().into()
    }

    /// Write every section, replacing the file.
    pub fn save(&self) -> ConfigResult<()> {
        let rendered = self.render()?;
        self.replace_file(&rendered)?;
        Ok(())
    }

    /// Persist one section; the rest of the file keeps its on-disk content.
    pub fn update_section(&mut self, section: ConfigSection) -> ConfigResult<()> {
        let on_disk = if self.config_path.exists() {
            fs::read_to_string(&self.config_path)?
        } else {
            String::new()
        };
        let mut doc: DocumentMut = on_disk.parse()?;

        let name = section.table_name();
        let fresh: DocumentMut = self.section_toml(section)?.parse()?;
        let mut table = fresh.as_table().clone();
        if let Some(existing) = doc.get(name).and_then(Item::as_table) {
            *table.decor_mut() = existing.decor().clone();
        }
        doc[name] = Item::Table(table);

        self.replace_file(&doc.to_string())?;
        tracing::debug!(section = name, "Config section saved");
        Ok(())
    }

    fn read_existing(&self) -> ConfigResult<String> {
        if !self.config_path.exists() {
            return Err(ConfigError::NotFound(self.config_path.clone()));
        }
        Ok(fs::read_to_string(&self.config_path)?)
    }

    fn section_toml(&self, section: ConfigSection) -> ConfigResult<String> {
        let s = &self.settings;
        Ok(match section {
            ConfigSection::Paths => toml::to_string_pretty(&s.paths)?,
            ConfigSection::Logging => toml::to_string_pretty(&s.logging)?,
            ConfigSection::Queue => toml::to_string_pretty(&s.queue)?,
            ConfigSection::Production => toml::to_string_pretty(&s.production)?,
            ConfigSection::Scheduler => toml::to_string_pretty(&s.scheduler)?,
        })
    }

    /// Full file text with a description comment above each table.
    fn render(&self) -> ConfigResult<String> {
        let mut doc: DocumentMut = toml::to_string_pretty(&self.settings)?.parse()?;
        for section in ConfigSection::ALL {
            let table = doc
                .get_mut(section.table_name())
                .and_then(Item::as_table_mut);
            if let Some(table) = table {
                table
                    .decor_mut()
                    .set_prefix(format!("\n# {}\n", section.description()));
            }
        }
        Ok(format!("{}{}", FILE_HEADER, doc))
    }

    fn replace_file(&self, content: &str) -> io::Result<()> {
        if let Some(dir) = self.config_path.parent() {
            fs::create_dir_all(dir)?;
        }

        let staging = self.config_path.with_extension("toml.tmp");
        let mut file = fs::File::create(&staging)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;
        drop(file);

        fs::rename(&staging, &self.config_path)
    }
}

/// Parse `content`; the flag is set when writing the typed settings back
/// would change the file's values or drop unknown tables.
fn parse_normalized(content: &str) -> ConfigResult<(Settings, bool)> {
    let doc: DocumentMut = content.parse()?;
    let settings: Settings = toml::from_str(content)?;

    let unknown_table = doc
        .iter()
        .any(|(key, _)| ConfigSection::ALL.iter().all(|s| s.table_name() != key));

    let as_written: toml::Table = toml::from_str(content)?;
    let normalized: toml::Table = toml::from_str(&toml::to_string_pretty(&settings)?)?;

    Ok((settings, unknown_table || as_written != normalized))
}
