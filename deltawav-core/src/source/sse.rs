//! `SseEventReader`: `text/event-stream` framing over any `BufRead`.
//!
//! ## Framing
//!
//! ```text
//! event: conversation.audio.delta     ← sets the record name
//! data: {"content":"AAEC..."}         ← data lines, joined with '\n'
//! : keep-alive                        ← comment, ignored
//!                                     ← blank line dispatches the record
//! ```
//!
//! `id:`, `retry:` and unknown fields are ignored. A record with data but no
//! `event:` is named `message`. A record whose data is the `[DONE]` sentinel
//! (quoted or bare) is surfaced under the terminal event name. A final record
//! not followed by a blank line is still dispatched at EOF.

use std::io::BufRead;
use std::time::Duration;

use tracing::trace;

use crate::error::{DeltawavError, Result};
use crate::ipc::events::{StreamEvent, TERMINAL_EVENT};
use crate::source::{EventSource, Pull};

const DEFAULT_EVENT_NAME: &str = "message";
const DONE_SENTINEL: &str = "[DONE]";
const QUOTED_DONE_SENTINEL: &str = "\"[DONE]\"";

pub struct SseEventReader<R> {
    reader: R,
    line: String,
    terminal_name: String,
    /// Records dispatched so far; also the index of the record being read.
    records: u64,
    eof: bool,
}

impl<R: BufRead> SseEventReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            terminal_name: TERMINAL_EVENT.to_string(),
            records: 0,
            eof: false,
        }
    }

    /// Name to give records carrying the `[DONE]` sentinel.
    pub fn with_terminal_name(mut self, name: impl Into<String>) -> Self {
        self.terminal_name = name.into();
        self
    }

    /// Number of records dispatched so far.
    pub fn records(&self) -> u64 {
        self.records
    }

    /// Read lines until one record is complete, or EOF.
    pub fn next_record(&mut self) -> Result<Option<StreamEvent>> {
        if self.eof {
            return Ok(None);
        }

        let mut name: Option<String> = None;
        let mut data: Option<String> = None;

        loop {
            self.line.clear();
            let n = self
                .reader
                .read_line(&mut self.line)
                .map_err(|source| DeltawavError::StreamIo {
                    index: self.records,
                    source,
                })?;

            if n == 0 {
                self.eof = true;
                return Ok(self.dispatch(name, data));
            }

            let line = self.line.trim_end_matches(['\n', '\r']);

            if line.is_empty() {
                match self.dispatch(name.take(), data.take()) {
                    Some(event) => return Ok(Some(event)),
                    None => continue,
                }
            }

            if line.starts_with(':') {
                continue;
            }

            let (field, value) = match line.split_once(':') {
                Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
                None => (line, ""),
            };

            match field {
                "event" => name = Some(value.to_string()),
                "data" => match data.as_mut() {
                    Some(existing) => {
                        existing.push('\n');
                        existing.push_str(value);
                    }
                    None => data = Some(value.to_string()),
                },
                _ => trace!(field, "ignoring SSE field"),
            }
        }
    }

    fn dispatch(&mut self, name: Option<String>, data: Option<String>) -> Option<StreamEvent> {
        let event = match (name, data) {
            (None, None) => return None,
            (_, Some(data)) if is_done_sentinel(&data) => {
                StreamEvent::new(self.terminal_name.clone(), data)
            }
            (name, data) => StreamEvent::new(
                name.unwrap_or_else(|| DEFAULT_EVENT_NAME.to_string()),
                data.unwrap_or_default(),
            ),
        };
        self.records += 1;
        Some(event)
    }
}

fn is_done_sentinel(data: &str) -> bool {
    let trimmed = data.trim();
    trimmed == DONE_SENTINEL || trimmed == QUOTED_DONE_SENTINEL
}

impl<R: BufRead + Send> EventSource for SseEventReader<R> {
    fn pull(&mut self, _wait: Duration) -> Result<Pull> {
        Ok(match self.next_record()? {
            Some(event) => Pull::Event(event),
            None => Pull::Exhausted,
        })
    }
}
