//! # deltawav-core
//!
//! Turns a server-sent stream of base64 audio-delta events into a WAV file.
//!
//! ## Architecture
//!
//! ```text
//! transport → EventSource::pull ─► assemble (Reading → Done)
//!                                        │
//!                                  PcmBuffer (moved)
//!                                        │
//!                              wav::encode_to_path → .partial → rename
//! ```
//!
//! Assembly finishes before encoding starts. The library only emits
//! `tracing` events; installing a subscriber is the host's job.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod audio;
pub mod buffering;
pub mod engine;
pub mod error;
pub mod ipc;
pub mod source;
pub mod wav;

// Convenience re-exports for downstream crates
pub use audio::AudioFormat;
pub use buffering::PcmBuffer;
pub use engine::{
    AssemblerConfig, Assembly, AssemblyReport, CancelToken, DecodePolicy, PipelineConfig,
    PipelineOutcome, Session,
};
pub use error::{DeltawavError, ErrorKind, Result};
pub use ipc::events::StreamEvent;
pub use source::{ChannelSource, EventSource, Pull, SseEventReader, VecSource};
