//! WAV decoding and segment stitching.
//!
//! Segment audio is decoded to normalized `f32` samples, concatenated in
//! order with no gap or crossfade, and re-encoded as 16-bit PCM WAV.

use std::io::Cursor;

use thiserror::Error;

/// Errors from decoding or stitching audio.
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Segment {index} is not valid WAV audio: {source}")]
    Decode {
        index: usize,
        #[source]
        source: hound::Error,
    },

    #[error(
        "Segment {index} format {found_rate} Hz/{found_channels} ch does not match {expected_rate} Hz/{expected_channels} ch"
    )]
    FormatMismatch {
        index: usize,
        expected_rate: u32,
        expected_channels: u16,
        found_rate: u32,
        found_channels: u16,
    },

    #[error("Failed to encode stitched audio: {0}")]
    Encode(#[source] hound::Error),

    #[error("No audio segments to stitch")]
    Empty,
}

/// Result type for audio operations.
pub type AudioResult<T> = Result<T, AudioError>;

/// Decoded PCM audio with samples in `[-1.0, 1.0]`, channels interleaved.
#[derive(Debug, Clone, PartialEq)]
pub struct PcmClip {
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<f32>,
}

impl PcmClip {
    /// Length in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / (self.sample_rate as f64 * self.channels as f64)
    }
}

/// Decode a WAV byte buffer.
pub fn decode_wav(bytes: &[u8]) -> Result<PcmClip, hound::Error> {
    let mut reader = hound::WavReader::new(Cursor::new(bytes))?;
    let spec = reader.spec();

    let samples = match spec.sample_format {
        hound::SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|sample| sample as f32 / max_val))
                .collect::<Result<Vec<f32>, _>>()?
        }
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<Vec<f32>, _>>()?,
    };

    Ok(PcmClip {
        sample_rate: spec.sample_rate,
        channels: spec.channels,
        samples,
    })
}

/// Encode a clip as 16-bit PCM WAV.
pub fn encode_wav(clip: &PcmClip) -> Result<Vec<u8>, hound::Error> {
    let spec = hound::WavSpec {
        channels: clip.channels,
        sample_rate: clip.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut buffer = Vec::new();
    {
        let mut writer = hound::WavWriter::new(Cursor::new(&mut buffer), spec)?;
        for &sample in &clip.samples {
            let value = (sample * 32768.0).round().clamp(-32768.0, 32767.0) as i16;
            writer.write_sample(value)?;
        }
        writer.finalize()?;
    }
    Ok(buffer)
}

/// Concatenate WAV segments in order into one WAV buffer.
///
/// Every segment must share the first segment's sample rate and channel
/// count.
pub fn stitch(segments: &[Vec<u8>]) -> AudioResult<Vec<u8>> {
    let mut stitched: Option<PcmClip> = None;

    for (index, bytes) in segments.iter().enumerate() {
        let clip = decode_wav(bytes).map_err(|source| AudioError::Decode { index, source })?;

        match stitched.as_mut() {
            None => stitched = Some(clip),
            Some(out) => {
                if clip.sample_rate != out.sample_rate || clip.channels != out.channels {
                    return Err(AudioError::FormatMismatch {
                        index,
                        expected_rate: out.sample_rate,
                        expected_channels: out.channels,
                        found_rate: clip.sample_rate,
                        found_channels: clip.channels,
                    });
                }
                out.samples.extend_from_slice(&clip.samples);
            }
        }
    }

    let clip = stitched.ok_or(AudioError::Empty)?;
    tracing::debug!(
        segments = segments.len(),
        secs = clip.duration_secs(),
        "Stitched dialogue"
    );
    encode_wav(&clip).map_err(AudioError::Encode)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Mono 16-bit WAV holding the given raw sample values.
    pub(crate) fn wav(sample_rate: u32, samples: &[i16]) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut buffer = Vec::new();
        {
            let mut writer = hound::WavWriter::new(Cursor::new(&mut buffer), spec).unwrap();
            for &s in samples {
                writer.write_sample(s).unwrap();
            }
            writer.finalize().unwrap();
        }
        buffer
    }

    fn raw_samples(bytes: &[u8]) -> Vec<i16> {
        hound::WavReader::new(Cursor::new(bytes))
            .unwrap()
            .samples::<i16>()
            .map(|s| s.unwrap())
            .collect()
    }

    #[test]
    fn stitch_preserves_order_without_gaps() {
        let a = wav(22050, &[100, 200, 300]);
        let b = wav(22050, &[-5, -6]);

        let out = stitch(&[a, b]).unwrap();
        assert_eq!(raw_samples(&out), vec![100, 200, 300, -5, -6]);
    }

    #[test]
    fn extreme_samples_survive_stitching() {
        let a = wav(8000, &[i16::MIN, i16::MAX, 0]);
        let out = stitch(&[a]).unwrap();
        assert_eq!(raw_samples(&out), vec![i16::MIN, i16::MAX, 0]);
    }

    #[test]
    fn mismatched_sample_rate_is_rejected() {
        let a = wav(22050, &[1]);
        let b = wav(44100, &[2]);
        assert!(matches!(
            stitch(&[a, b]),
            Err(AudioError::FormatMismatch { index: 1, .. })
        ));
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let a = wav(22050, &[1]);
        let err = stitch(&[a, b"not a wav".to_vec()]).unwrap_err();
        assert!(matches!(err, AudioError::Decode { index: 1, .. }));
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(matches!(stitch(&[]), Err(AudioError::Empty)));
    }

    #[test]
    fn duration_from_sample_count() {
        let clip = decode_wav(&wav(4, &[0, 0, 0, 0, 0, 0])).unwrap();
        assert!((clip.duration_secs() - 1.5).abs() < 1e-9);
    }
}
