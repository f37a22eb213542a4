//! Local output folder delivery.

use std::io;
use std::path::{Path, PathBuf};

use crate::models::ArtifactLocators;

use super::collaborators::ProcessedAudio;

/// Writes finished artifacts into the output folder.
///
/// Subtitle and video artifacts sit next to the audio file with `.srt`
/// and `.mp4` extensions.
#[derive(Debug, Clone)]
pub struct LocalFolderDelivery {
    output_dir: PathBuf,
}

impl LocalFolderDelivery {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Write every artifact and return where each one landed.
    pub async fn store(
        &self,
        file_name: &str,
        processed: &ProcessedAudio,
    ) -> io::Result<ArtifactLocators> {
        tokio::fs::create_dir_all(&self.output_dir).await?;

        let audio_path = self.output_dir.join(safe_file_name(file_name));
        write_atomic(&audio_path, &processed.primary_audio).await?;

        let mut artifacts = ArtifactLocators {
            audio: Some(audio_path.to_string_lossy().into_owned()),
            ..Default::default()
        };

        if let Some(ref subtitle) = processed.subtitle {
            let path = audio_path.with_extension("srt");
            write_atomic(&path, subtitle).await?;
            artifacts.subtitle = Some(path.to_string_lossy().into_owned());
        }
        if let Some(ref video) = processed.video {
            let path = audio_path.with_extension("mp4");
            write_atomic(&path, video).await?;
            artifacts.video = Some(path.to_string_lossy().into_owned());
        }

        Ok(artifacts)
    }
}

/// Keep the name inside the output folder.
fn safe_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '\0' => '_',
            c => c,
        })
        .collect();
    match cleaned.trim_matches('.') {
        "" => "audio.mp3".to_string(),
        _ => cleaned,
    }
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await
}
