//! Blocking fragment assembly loop.
//!
//! ## Per iteration
//!
//! ```text
//! 1. Check cancel token and deadline
//! 2. Pull one event from the source (may block, or return Idle)
//! 3. Classify by name → AudioDelta | Terminal | Failure | Other
//! 4. AudioDelta: parse JSON payload, base64-decode content, append
//! 5. Terminal: Reading → Done, stop pulling
//! ```
//!
//! Nothing is read from the source once the terminal event has been seen.

use std::time::{Duration, Instant};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::{
    buffering::PcmBuffer,
    engine::CancelToken,
    error::{DeltawavError, Result},
    ipc::events::{
        FailurePayload, StreamEvent, AUDIO_DELTA_EVENT, CONTENT_KEY, FAILURE_EVENT,
        TERMINAL_EVENT,
    },
    source::{EventSource, Pull},
};

/// How long one pull may wait before the loop re-checks cancellation.
const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// What to do with a fragment whose payload or base64 is malformed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DecodePolicy {
    /// Abort assembly with a decode error on the first bad fragment.
    #[default]
    Strict,
    /// Skip the bad fragment, warn, and record its index in the report.
    Lenient,
}

/// Configuration for `assemble`.
#[derive(Debug, Clone)]
pub struct AssemblerConfig {
    /// Event name carrying an audio fragment.
    pub audio_delta_event: String,
    /// Event name ending the stream.
    pub terminal_event: String,
    /// Event name signalling a server-side failure. `None` treats it as unknown.
    pub failure_event: Option<String>,
    /// JSON key holding base64 PCM inside an audio-delta payload.
    pub content_key: String,
    pub decode_policy: DecodePolicy,
    /// Overall time budget, measured from the start of assembly.
    pub deadline: Option<Duration>,
    /// Upper bound on a single pull's wait for sources that support it.
    pub poll_interval: Duration,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            audio_delta_event: AUDIO_DELTA_EVENT.to_string(),
            terminal_event: TERMINAL_EVENT.to_string(),
            failure_event: Some(FAILURE_EVENT.to_string()),
            content_key: CONTENT_KEY.to_string(),
            decode_policy: DecodePolicy::Strict,
            deadline: None,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

/// Counters describing one assembly run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssemblyReport {
    /// Events pulled, including the terminal event.
    pub events_seen: u64,
    /// Audio-delta events whose bytes were appended.
    pub fragments_appended: u64,
    /// Audio-delta events without a content key.
    pub empty_fragments: u64,
    /// Events with names the assembler does not act on.
    pub ignored_events: u64,
    pub bytes_appended: u64,
    /// Indices of audio-delta events dropped under `DecodePolicy::Lenient`.
    pub skipped_events: Vec<u64>,
}

impl AssemblyReport {
    /// `true` when no fragment was dropped.
    pub fn is_lossless(&self) -> bool {
        self.skipped_events.is_empty()
    }
}

/// Result of a completed assembly: the frozen buffer plus its report.
#[derive(Debug, Clone)]
pub struct Assembly {
    pub pcm: PcmBuffer,
    pub report: AssemblyReport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Reading,
    Done,
}

enum EventClass {
    AudioDelta,
    Terminal,
    Failure,
    Other,
}

fn classify(event: &StreamEvent, config: &AssemblerConfig) -> EventClass {
    let name = event.name.as_str();
    if name == config.audio_delta_event {
        EventClass::AudioDelta
    } else if name == config.terminal_event {
        EventClass::Terminal
    } else if config.failure_event.as_deref() == Some(name) {
        EventClass::Failure
    } else {
        EventClass::Other
    }
}

/// Pull events from `source` until the terminal event and return the PCM.
///
/// # Errors
/// - Stream-class errors from the source, `Truncated` if the source runs dry
///   before the terminal event, `ServerFailure` on the failure event.
/// - Decode-class errors on a malformed fragment under `DecodePolicy::Strict`.
/// - `Cancelled` / `DeadlineExceeded` when the token fires or time runs out.
pub fn assemble<S: EventSource + ?Sized>(
    source: &mut S,
    config: &AssemblerConfig,
    cancel: &CancelToken,
) -> Result<Assembly> {
    let deadline = config.deadline.map(|budget| Instant::now() + budget);
    let mut pcm = PcmBuffer::new();
    let mut report = AssemblyReport::default();
    let mut state = State::Reading;

    debug!(
        audio_delta_event = %config.audio_delta_event,
        terminal_event = %config.terminal_event,
        policy = ?config.decode_policy,
        "assembly started"
    );

    while state == State::Reading {
        if cancel.is_cancelled() {
            return Err(DeltawavError::Cancelled {
                events: report.events_seen,
            });
        }

        let wait = match deadline {
            Some(at) => {
                let now = Instant::now();
                if now >= at {
                    return Err(DeltawavError::DeadlineExceeded {
                        events: report.events_seen,
                    });
                }
                config.poll_interval.min(at - now)
            }
            None => config.poll_interval,
        };

        let event = match source.pull(wait)? {
            Pull::Event(event) => event,
            Pull::Idle => continue,
            Pull::Exhausted => {
                return Err(DeltawavError::Truncated {
                    events: report.events_seen,
                })
            }
        };

        let index = report.events_seen;
        report.events_seen += 1;

        state = match classify(&event, config) {
            EventClass::AudioDelta => {
                append_fragment(&mut pcm, &mut report, &event, index, config)?;
                State::Reading
            }
            EventClass::Terminal => State::Done,
            EventClass::Failure => {
                return Err(DeltawavError::ServerFailure {
                    index,
                    message: FailurePayload::describe(&event.payload),
                })
            }
            EventClass::Other => {
                report.ignored_events += 1;
                debug!(index, name = %event.name, "ignoring event");
                State::Reading
            }
        };
    }

    if report.is_lossless() {
        info!(
            events = report.events_seen,
            fragments = report.fragments_appended,
            bytes = pcm.len(),
            "assembly complete"
        );
    } else {
        warn!(
            events = report.events_seen,
            fragments = report.fragments_appended,
            skipped = report.skipped_events.len(),
            bytes = pcm.len(),
            "assembly complete with skipped fragments"
        );
    }

    Ok(Assembly { pcm, report })
}

fn append_fragment(
    pcm: &mut PcmBuffer,
    report: &mut AssemblyReport,
    event: &StreamEvent,
    index: u64,
    config: &AssemblerConfig,
) -> Result<()> {
    match decode_fragment(&event.payload, &config.content_key, index) {
        Ok(Some(bytes)) => {
            debug!(index, len = bytes.len(), offset = pcm.len(), "fragment appended");
            pcm.append(&bytes);
            report.fragments_appended += 1;
            report.bytes_appended += bytes.len() as u64;
            Ok(())
        }
        Ok(None) => {
            report.empty_fragments += 1;
            Ok(())
        }
        Err(e) => match config.decode_policy {
            DecodePolicy::Strict => Err(e),
            DecodePolicy::Lenient => {
                warn!(index, offset = pcm.len(), error = %e, "skipping malformed audio fragment");
                report.skipped_events.push(index);
                Ok(())
            }
        },
    }
}

/// Decode one audio-delta payload. `Ok(None)` means the content key is absent.
fn decode_fragment(payload: &str, content_key: &str, index: u64) -> Result<Option<Vec<u8>>> {
    let fields: Map<String, Value> = serde_json::from_str(payload)
        .map_err(|source| DeltawavError::Payload { index, source })?;

    match fields.get(content_key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => BASE64
            .decode(text)
            .map(Some)
            .map_err(|source| DeltawavError::Base64 { index, source }),
        Some(_) => Err(DeltawavError::ContentNotString { index }),
    }
}
