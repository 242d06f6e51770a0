//! Wire types exchanged with the upstream event producer.
//!
//! Everything here derives `serde` so payloads can be parsed straight from
//! the `data:` field of a server-sent event.

pub mod events;
