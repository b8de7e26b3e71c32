//! Sink implementations
//!
//! Contains McapSink, LogSink, and MemorySink.

mod log;
mod mcap;
mod memory;

pub use self::log::LogSink;
pub use self::mcap::{McapOptions, McapSink};
pub use self::memory::{MemoryRecording, MemorySink, SinkState};
