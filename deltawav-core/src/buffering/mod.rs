//! PCM byte accumulation.
//!
//! The assembler appends decoded fragments into a single owned `PcmBuffer`.
//! Once the terminal event is seen the buffer is handed off by value and no
//! longer exposes any way to grow.

pub mod pcm;

pub use pcm::PcmBuffer;
