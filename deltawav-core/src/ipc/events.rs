//! Stream event records and the payload shapes deltawav understands.
//!
//! ## Event names (reference producer)
//!
//! | Event | Meaning |
//! |-------|---------|
//! | `conversation.audio.delta` | JSON object, `content` holds base64 PCM |
//! | `conversation.chat.failed` | JSON object, `last_error.msg` explains why |
//! | `done` | end of stream |
//!
//! The names are configurable in `AssemblerConfig`; these are only defaults.

use serde::{Deserialize, Serialize};

/// Audio fragment event name used by the reference producer.
pub const AUDIO_DELTA_EVENT: &str = "conversation.audio.delta";
/// Terminal event name used by the reference producer.
pub const TERMINAL_EVENT: &str = "done";
/// Server-side failure event name used by the reference producer.
pub const FAILURE_EVENT: &str = "conversation.chat.failed";
/// Payload key carrying base64 PCM inside an audio-delta event.
pub const CONTENT_KEY: &str = "content";

/// One named event as yielded by the producer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamEvent {
    pub name: String,
    /// Raw payload text, usually JSON. Not interpreted until classified.
    pub payload: String,
}

impl StreamEvent {
    pub fn new(name: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            payload: payload.into(),
        }
    }
}

/// Payload of a server-side failure event.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FailurePayload {
    pub last_error: Option<LastError>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LastError {
    pub code: Option<i64>,
    pub msg: Option<String>,
}

impl FailurePayload {
    /// Best-effort human-readable reason; falls back to the raw payload.
    pub fn describe(raw: &str) -> String {
        serde_json::from_str::<FailurePayload>(raw)
            .ok()
            .and_then(|p| p.last_error)
            .and_then(|e| match (e.msg, e.code) {
                (Some(msg), Some(code)) => Some(format!("{msg} (code {code})")),
                (Some(msg), None) => Some(msg),
                (None, Some(code)) => Some(format!("code {code}")),
                (None, None) => None,
            })
            .unwrap_or_else(|| {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    "no detail provided".to_string()
                } else {
                    trimmed.to_string()
                }
            })
    }
}
