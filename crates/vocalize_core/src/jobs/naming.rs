//! Output filename generation.

use chrono::{DateTime, Utc};

use crate::models::{is_bengali, NamingConvention};

/// Number of characters kept by the text-preview convention.
pub const PREVIEW_LEN: usize = 15;

const EXTENSION: &str = "mp3";

/// Stitched story audio is WAV.
pub const STITCHED_EXTENSION: &str = "wav";

/// Builds output filenames under the active naming convention.
#[derive(Debug, Clone)]
pub struct FileNamer {
    convention: NamingConvention,
    custom_prefix: String,
}

impl FileNamer {
    pub fn new(convention: NamingConvention, custom_prefix: impl Into<String>) -> Self {
        Self {
            convention,
            custom_prefix: custom_prefix.into(),
        }
    }

    pub fn convention(&self) -> NamingConvention {
        self.convention
    }

    /// Filename for `text`, stamped with the current time.
    ///
    /// `row` is the 1-based batch row; ignored outside row-index naming.
    pub fn name(&self, text: &str, row: Option<usize>) -> String {
        self.name_at(text, row, Utc::now())
    }

    /// Filename for `text` with an explicit timestamp.
    pub fn name_at(&self, text: &str, row: Option<usize>, at: DateTime<Utc>) -> String {
        self.name_with_extension(text, row, at, EXTENSION)
    }

    /// Filename for a stitched story, which is written as WAV.
    pub fn stitched_name_at(&self, text: &str, at: DateTime<Utc>) -> String {
        self.name_with_extension(text, None, at, STITCHED_EXTENSION)
    }

    fn name_with_extension(
        &self,
        text: &str,
        row: Option<usize>,
        at: DateTime<Utc>,
        extension: &str,
    ) -> String {
        let millis = at.timestamp_millis();
        let base = match self.convention {
            NamingConvention::Timestamp => format!("Prod_{}", millis),
            NamingConvention::RowIndex => format!("Row_{}", row.unwrap_or(0)),
            NamingConvention::TextPreview => text_preview(text),
            NamingConvention::CustomPrefix => format!("{}{}", self.custom_prefix, millis),
        };
        format!("{}.{}", base, extension)
    }
}

/// First `PREVIEW_LEN` characters with every run of characters outside
/// ASCII alphanumerics and the Bengali block collapsed to one `_`.
fn text_preview(text: &str) -> String {
    let mut out = String::new();
    let mut pending_sep = false;

    for c in text.chars().take(PREVIEW_LEN) {
        if c.is_ascii_alphanumeric() || is_bengali(c) {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.push(c);
        } else {
            pending_sep = true;
        }
    }

    if out.is_empty() {
        "audio".to_string()
    } else {
        out
    }
}
