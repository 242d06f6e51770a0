//! `ChannelSource`: producer fed by another thread over a crossbeam channel.
//!
//! The transport task owns the `EventSender` and pushes events (or a transport
//! error) as they arrive. Dropping every sender signals exhaustion.

use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use crate::error::Result;
use crate::ipc::events::StreamEvent;
use crate::source::{EventSource, Pull};

/// Sending half handed to the transport thread.
pub type EventSender = Sender<Result<StreamEvent>>;

pub struct ChannelSource {
    rx: Receiver<Result<StreamEvent>>,
}

impl ChannelSource {
    pub fn new(rx: Receiver<Result<StreamEvent>>) -> Self {
        Self { rx }
    }
}

/// Create a matched sender/source pair.
///
/// `capacity` of `None` gives an unbounded channel; a bounded channel applies
/// back-pressure to the transport thread.
pub fn event_channel(capacity: Option<usize>) -> (EventSender, ChannelSource) {
    let (tx, rx) = match capacity {
        Some(cap) => crossbeam_channel::bounded(cap),
        None => crossbeam_channel::unbounded(),
    };
    (tx, ChannelSource::new(rx))
}

impl EventSource for ChannelSource {
    fn pull(&mut self, wait: Duration) -> Result<Pull> {
        match self.rx.recv_timeout(wait) {
            Ok(item) => item.map(Pull::Event),
            Err(RecvTimeoutError::Timeout) => Ok(Pull::Idle),
            Err(RecvTimeoutError::Disconnected) => Ok(Pull::Exhausted),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DeltawavError;

    #[test]
    fn idle_until_sent_then_exhausted_on_drop() {
        let (tx, mut source) = event_channel(Some(4));
        let wait = Duration::from_millis(5);

        assert_eq!(source.pull(wait).unwrap(), Pull::Idle);

        tx.send(Ok(StreamEvent::new("done", ""))).unwrap();
        assert_eq!(
            source.pull(wait).unwrap(),
            Pull::Event(StreamEvent::new("done", ""))
        );

        drop(tx);
        assert_eq!(source.pull(wait).unwrap(), Pull::Exhausted);
    }

    #[test]
    fn forwards_transport_errors() {
        let (tx, mut source) = event_channel(None);
        tx.send(Err(DeltawavError::Stream {
            index: 0,
            message: "tls alert".into(),
        }))
        .unwrap();
        let err = source.pull(Duration::from_millis(5)).unwrap_err();
        assert!(err.to_string().contains("tls alert"));
    }
}
