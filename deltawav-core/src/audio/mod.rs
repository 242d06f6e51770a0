//! Audio format descriptor.
//!
//! The upstream voice service always streams mono 16-bit little-endian PCM at
//! 24 kHz. That contract is held here as one explicit struct so the encoder
//! never reaches for inline literals.

use serde::{Deserialize, Serialize};

use crate::error::{DeltawavError, Result};

/// Sample rate of the upstream audio-delta stream (Hz).
pub const STREAM_SAMPLE_RATE: u32 = 24_000;
/// Bits per sample of the upstream audio-delta stream.
pub const STREAM_BIT_DEPTH: u16 = 16;
/// Channel count of the upstream audio-delta stream.
pub const STREAM_CHANNELS: u16 = 1;

/// PCM layout of an assembled buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioFormat {
    /// Samples per second per channel.
    pub sample_rate: u32,
    /// Bits per sample. Only 16 is accepted.
    pub bit_depth: u16,
    /// Interleaved channel count. Only mono is accepted.
    pub channel_count: u16,
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self {
            sample_rate: STREAM_SAMPLE_RATE,
            bit_depth: STREAM_BIT_DEPTH,
            channel_count: STREAM_CHANNELS,
        }
    }
}

impl AudioFormat {
    /// Bytes per sample frame (all channels).
    pub fn block_align(&self) -> u16 {
        self.channel_count.saturating_mul(self.bit_depth / 8)
    }

    /// Bytes per second of audio, or `None` when it overflows the header's
    /// 32-bit field.
    pub fn byte_rate(&self) -> Option<u32> {
        self.sample_rate.checked_mul(u32::from(self.block_align()))
    }

    /// Duration in seconds of `len` bytes of PCM in this format.
    pub fn duration_secs(&self, len: usize) -> f64 {
        let rate = f64::from(self.sample_rate) * f64::from(self.block_align());
        if rate == 0.0 {
            return 0.0;
        }
        len as f64 / rate
    }

    /// Reject anything other than mono 16-bit PCM with a non-zero rate whose
    /// byte rate fits in the WAV header.
    ///
    /// # Errors
    /// `DeltawavError::UnsupportedFormat` naming the offending field.
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(DeltawavError::UnsupportedFormat(
                "sample rate must be non-zero".into(),
            ));
        }
        if self.bit_depth != STREAM_BIT_DEPTH {
            return Err(DeltawavError::UnsupportedFormat(format!(
                "bit depth {} (only {STREAM_BIT_DEPTH}-bit PCM is supported)",
                self.bit_depth
            )));
        }
        if self.channel_count != STREAM_CHANNELS {
            return Err(DeltawavError::UnsupportedFormat(format!(
                "{} channels (only mono is supported)",
                self.channel_count
            )));
        }
        if self.byte_rate().is_none() {
            return Err(DeltawavError::UnsupportedFormat(format!(
                "sample rate {} Hz overflows the 32-bit byte-rate field",
                self.sample_rate
            )));
        }
        Ok(())
    }

    pub(crate) fn wav_spec(&self) -> hound::WavSpec {
        hound::WavSpec {
            channels: self.channel_count,
            sample_rate: self.sample_rate,
            bits_per_sample: self.bit_depth,
            sample_format: hound::SampleFormat::Int,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn default_is_mono_16_bit_24k() {
        let format = AudioFormat::default();
        assert_eq!(format.sample_rate, 24_000);
        assert_eq!(format.bit_depth, 16);
        assert_eq!(format.channel_count, 1);
        assert_eq!(format.block_align(), 2);
        assert_eq!(format.byte_rate(), Some(48_000));
        assert!(format.validate().is_ok());
    }

    #[test]
    fn duration_uses_byte_rate() {
        let format = AudioFormat::default();
        assert!((format.duration_secs(48_000) - 1.0).abs() < 1e-9);
        assert_eq!(format.duration_secs(0), 0.0);
    }

    #[test]
    fn rejects_other_layouts() {
        let stereo = AudioFormat {
            channel_count: 2,
            ..AudioFormat::default()
        };
        assert_eq!(stereo.validate().unwrap_err().kind(), ErrorKind::Format);

        let wide = AudioFormat {
            bit_depth: 24,
            ..AudioFormat::default()
        };
        assert!(wide.validate().is_err());

        let silent = AudioFormat {
            sample_rate: 0,
            ..AudioFormat::default()
        };
        assert!(silent.validate().is_err());
    }

    #[test]
    fn rejects_rate_whose_byte_rate_overflows() {
        let huge = AudioFormat {
            sample_rate: 3_000_000_000,
            ..AudioFormat::default()
        };
        assert_eq!(huge.byte_rate(), None);
        assert_eq!(huge.validate().unwrap_err().kind(), ErrorKind::Format);
        assert!((huge.duration_secs(3_000_000_000) - 0.5).abs() < 1e-9);

        let highest = AudioFormat {
            sample_rate: u32::MAX / 2,
            ..AudioFormat::default()
        };
        assert!(highest.validate().is_ok());
    }

    #[test]
    fn deserializes_camel_case() {
        let format: AudioFormat =
            serde_json::from_str(r#"{"sampleRate":16000,"bitDepth":16,"channelCount":1}"#)
                .expect("parse format");
        assert_eq!(format.sample_rate, 16_000);
    }
}
