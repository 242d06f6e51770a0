//! PCM → WAV encoding.
//!
//! ## Layout
//!
//! ```text
//! offset  size  field
//!      0     4  "RIFF"
//!      4     4  36 + data_len
//!      8     4  "WAVE"
//!     12     4  "fmt "
//!     16     4  16 (PCM fmt chunk)
//!     20     2  1 (integer PCM)
//!     22     2  channel count
//!     24     4  sample rate
//!     28     4  byte rate
//!     32     2  block align
//!     34     2  bits per sample
//!     36     4  "data"
//!     40     4  data_len
//!     44     …  little-endian i16 samples
//! ```
//!
//! `hound` writes the header up front and patches both size fields when the
//! writer is finalized, so the sizes are exact rather than placeholders.

use std::fs::{self, File};
use std::io::{BufWriter, Read, Seek, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{
    audio::AudioFormat,
    buffering::PcmBuffer,
    error::{DeltawavError, Result},
};

/// Size of the canonical PCM WAV header.
pub const HEADER_LEN: usize = 44;

/// Largest data chunk whose RIFF size still fits in a `u32`.
const MAX_DATA_LEN: usize = (u32::MAX as usize) - (HEADER_LEN - 8);

/// Encode `pcm` as a WAV container into `sink`.
///
/// The sink is taken by value and dropped before returning, on success and
/// on error alike.
///
/// # Errors
/// - Format-class errors for an odd-length buffer or an unsupported format.
/// - Io-class errors when the sink fails.
pub fn encode<W: Write + Seek>(pcm: &PcmBuffer, format: &AudioFormat, sink: W) -> Result<()> {
    check_encodable(pcm, format)?;

    let mut writer = hound::WavWriter::new(sink, format.wav_spec())?;
    for sample in pcm.samples_i16() {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;

    debug!(bytes = pcm.len(), "WAV encoded");
    Ok(())
}

/// Encode `pcm` to `path`, replacing it only once the whole file is written.
///
/// The WAV is written to a hidden sibling (`.<name>.partial`), synced, and
/// renamed over `path`. Any failure removes the partial file, so a reader
/// never sees a half-written WAV at `path`. Nothing is created when the
/// buffer or format is rejected up front.
pub fn encode_to_path(pcm: &PcmBuffer, format: &AudioFormat, path: &Path) -> Result<()> {
    check_encodable(pcm, format)?;

    let (partial, file) = PartialFile::create(path)?;
    let mut sink = BufWriter::new(file);
    encode(pcm, format, &mut sink)?;

    let file = sink
        .into_inner()
        .map_err(|e| partial.io_error(e.into_error()))?;
    file.sync_all().map_err(|e| partial.io_error(e))?;
    drop(file);

    partial.commit()
}

/// Read a WAV produced by `encode` back into its format and PCM bytes.
///
/// # Errors
/// `DeltawavError::Wav` if the container is malformed or not integer PCM.
pub fn read_pcm<R: Read>(reader: R) -> Result<(AudioFormat, PcmBuffer)> {
    let mut reader = hound::WavReader::new(reader)?;
    let spec = reader.spec();
    if spec.sample_format != hound::SampleFormat::Int {
        return Err(DeltawavError::UnsupportedFormat(
            "floating-point WAV data".into(),
        ));
    }
    let format = AudioFormat {
        sample_rate: spec.sample_rate,
        bit_depth: spec.bits_per_sample,
        channel_count: spec.channels,
    };
    format.validate()?;

    let mut bytes = Vec::with_capacity(reader.len() as usize * 2);
    for sample in reader.samples::<i16>() {
        bytes.extend_from_slice(&sample?.to_le_bytes());
    }
    Ok((format, PcmBuffer::from(bytes)))
}

fn check_encodable(pcm: &PcmBuffer, format: &AudioFormat) -> Result<()> {
    format.validate()?;
    pcm.ensure_whole_samples()?;
    if pcm.len() > MAX_DATA_LEN {
        return Err(DeltawavError::UnsupportedFormat(format!(
            "{} PCM bytes exceed the 4 GiB RIFF limit",
            pcm.len()
        )));
    }
    Ok(())
}

/// Hidden sibling file that is removed on drop unless committed.
struct PartialFile {
    partial: PathBuf,
    dest: PathBuf,
    committed: bool,
}

impl PartialFile {
    fn create(dest: &Path) -> Result<(Self, File)> {
        let name = dest.file_name().ok_or_else(|| DeltawavError::Sink {
            path: dest.to_path_buf(),
            source: std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "destination has no file name",
            ),
        })?;
        let mut partial_name = std::ffi::OsString::from(".");
        partial_name.push(name);
        partial_name.push(".partial");
        let partial = dest.with_file_name(partial_name);

        let file = File::create(&partial).map_err(|source| DeltawavError::Sink {
            path: partial.clone(),
            source,
        })?;

        Ok((
            Self {
                partial,
                dest: dest.to_path_buf(),
                committed: false,
            },
            file,
        ))
    }

    fn io_error(&self, source: std::io::Error) -> DeltawavError {
        DeltawavError::Sink {
            path: self.partial.clone(),
            source,
        }
    }

    fn commit(mut self) -> Result<()> {
        fs::rename(&self.partial, &self.dest).map_err(|source| DeltawavError::Sink {
            path: self.dest.clone(),
            source,
        })?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if !self.committed {
            if let Err(e) = fs::remove_file(&self.partial) {
                debug!(path = %self.partial.display(), error = %e, "partial file cleanup failed");
            }
        }
    }
}
