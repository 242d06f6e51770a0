use std::path::PathBuf;

use thiserror::Error;

/// All errors produced by deltawav-core.
#[derive(Debug, Error)]
pub enum DeltawavError {
    #[error("stream error at event {index}: {message}")]
    Stream { index: u64, message: String },

    #[error("stream read failed at event {index}: {source}")]
    StreamIo {
        index: u64,
        #[source]
        source: std::io::Error,
    },

    #[error("stream ended after {events} events without a terminal event")]
    Truncated { events: u64 },

    #[error("server reported failure at event {index}: {message}")]
    ServerFailure { index: u64, message: String },

    #[error("malformed payload at event {index}: {source}")]
    Payload {
        index: u64,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid base64 audio at event {index}: {source}")]
    Base64 {
        index: u64,
        #[source]
        source: base64::DecodeError,
    },

    #[error("audio content at event {index} is not a string")]
    ContentNotString { index: u64 },

    #[error("odd PCM length {len}: buffer ends mid-sample at byte offset {offset}")]
    OddPcmLength { len: usize, offset: usize },

    #[error("unsupported audio format: {0}")]
    UnsupportedFormat(String),

    #[error("WAV encoding failed: {0}")]
    Wav(#[from] hound::Error),

    #[error("IO error on {path}: {source}")]
    Sink {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cancelled after {events} events")]
    Cancelled { events: u64 },

    #[error("deadline exceeded after {events} events")]
    DeadlineExceeded { events: u64 },

    #[error("pipeline task died unexpectedly: {0}")]
    TaskFailed(String),
}

/// Coarse error category, for callers that only need to branch on class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Producer or transport failure, including a stream that never terminated.
    Stream,
    /// Malformed payload or base64 inside one fragment.
    Decode,
    /// PCM buffer or format parameters unfit for encoding.
    Format,
    /// Sink creation, write, or close failure.
    Io,
    /// Cancel token fired or deadline passed.
    Cancelled,
}

impl DeltawavError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DeltawavError::Stream { .. }
            | DeltawavError::StreamIo { .. }
            | DeltawavError::Truncated { .. }
            | DeltawavError::ServerFailure { .. }
            | DeltawavError::TaskFailed(_) => ErrorKind::Stream,
            DeltawavError::Payload { .. }
            | DeltawavError::Base64 { .. }
            | DeltawavError::ContentNotString { .. } => ErrorKind::Decode,
            DeltawavError::OddPcmLength { .. } | DeltawavError::UnsupportedFormat(_) => {
                ErrorKind::Format
            }
            DeltawavError::Wav(hound::Error::IoError(_)) | DeltawavError::Sink { .. } => {
                ErrorKind::Io
            }
            DeltawavError::Wav(_) => ErrorKind::Format,
            DeltawavError::Cancelled { .. } | DeltawavError::DeadlineExceeded { .. } => {
                ErrorKind::Cancelled
            }
        }
    }

    /// Index of the stream event the error is attributed to, if any.
    pub fn event_index(&self) -> Option<u64> {
        match self {
            DeltawavError::Stream { index, .. }
            | DeltawavError::StreamIo { index, .. }
            | DeltawavError::ServerFailure { index, .. }
            | DeltawavError::Payload { index, .. }
            | DeltawavError::Base64 { index, .. }
            | DeltawavError::ContentNotString { index } => Some(*index),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, DeltawavError>;
