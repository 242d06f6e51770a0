//! Event producer abstraction.
//!
//! The `EventSource` trait is the seam between the transport (HTTP streaming,
//! SSE capture files, a websocket task on another thread) and the assembler.
//! Swap in `SseEventReader`, `ChannelSource`, `VecSource`, or any custom
//! producer without touching the assembly loop.

pub mod channel;
pub mod memory;
pub mod sse;

pub use channel::{event_channel, ChannelSource, EventSender};
pub use memory::VecSource;
pub use sse::SseEventReader;

use std::time::Duration;

use crate::error::Result;
use crate::ipc::events::StreamEvent;

/// Outcome of a single pull from a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pull {
    /// The next event in producer order.
    Event(StreamEvent),
    /// Nothing arrived within the wait window; the producer is still live.
    Idle,
    /// The producer has no more events.
    Exhausted,
}

/// Contract for stream event producers.
///
/// Implementors yield events strictly in arrival order. Blocking readers may
/// ignore `wait` and block until the next event or EOF; sources that can
/// time out should return `Pull::Idle` so the caller gets a chance to honour
/// cancellation.
pub trait EventSource: Send {
    /// Pull the next event, waiting at most roughly `wait` when supported.
    ///
    /// # Errors
    /// Transport failures surface as stream-class `DeltawavError`s.
    fn pull(&mut self, wait: Duration) -> Result<Pull>;
}

impl<S: EventSource + ?Sized> EventSource for Box<S> {
    fn pull(&mut self, wait: Duration) -> Result<Pull> {
        (**self).pull(wait)
    }
}

impl<S: EventSource + ?Sized> EventSource for &mut S {
    fn pull(&mut self, wait: Duration) -> Result<Pull> {
        (**self).pull(wait)
    }
}
