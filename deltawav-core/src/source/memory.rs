//! `VecSource`: in-memory producer over a pre-collected event list.
//!
//! Handy when a caller already holds every event, and the workhorse of the
//! test suite: a scripted sequence can mix events and transport errors.

use std::collections::VecDeque;
use std::time::Duration;

use crate::error::Result;
use crate::ipc::events::StreamEvent;
use crate::source::{EventSource, Pull};

#[derive(Debug, Default)]
pub struct VecSource {
    items: VecDeque<Result<StreamEvent>>,
    pulled: usize,
}

impl VecSource {
    pub fn new(events: impl IntoIterator<Item = StreamEvent>) -> Self {
        Self::from_results(events.into_iter().map(Ok))
    }

    /// Build from a script that may contain transport errors.
    pub fn from_results(items: impl IntoIterator<Item = Result<StreamEvent>>) -> Self {
        Self {
            items: items.into_iter().collect(),
            pulled: 0,
        }
    }

    /// Number of items handed out so far (events and errors).
    pub fn pulled(&self) -> usize {
        self.pulled
    }

    /// Number of items not yet pulled.
    pub fn remaining(&self) -> usize {
        self.items.len()
    }
}

impl EventSource for VecSource {
    fn pull(&mut self, _wait: Duration) -> Result<Pull> {
        match self.items.pop_front() {
            Some(item) => {
                self.pulled += 1;
                item.map(Pull::Event)
            }
            None => Ok(Pull::Exhausted),
        }
    }
}
