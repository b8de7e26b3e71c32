//! Event - the unit handed to sinks
//!
//! `(timestamp_ns, topic, payload)` plus the schema needed to register the
//! topic in the output container.

use bytes::Bytes;

use crate::Topic;

/// Convert dataset microseconds to container nanoseconds
#[inline]
pub const fn micros_to_nanos(micros: u64) -> u64 {
    micros * 1_000
}

/// Split nanoseconds into ROS `(sec, nanosec)`
#[inline]
pub fn nanos_to_sec_nsec(nanos: u64) -> (i32, u32) {
    let sec = nanos / 1_000_000_000;
    let nsec = nanos - sec * 1_000_000_000;
    (sec as i32, nsec as u32)
}

/// Anything with a nanosecond timestamp
pub trait Timestamped {
    fn timestamp_ns(&self) -> u64;
}

/// Message schema (ROS 2 `.msg` text, `ros2msg` encoding)
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct MessageSchema {
    /// Fully qualified type name, e.g. `sensor_msgs/msg/PointCloud2`
    pub name: &'static str,
    /// Concatenated message definition
    pub definition: &'static str,
}

/// Serialized message ready for the sink
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Log time, nanoseconds
    pub timestamp_ns: u64,
    pub topic: Topic,
    pub schema: &'static MessageSchema,
    /// CDR-encoded message
    pub payload: Bytes,
}

impl Event {
    pub fn new(
        timestamp_ns: u64,
        topic: impl Into<Topic>,
        schema: &'static MessageSchema,
        payload: impl Into<Bytes>,
    ) -> Self {
        Self {
            timestamp_ns,
            topic: topic.into(),
            schema,
            payload: payload.into(),
        }
    }
}

impl Timestamped for Event {
    fn timestamp_ns(&self) -> u64 {
        self.timestamp_ns
    }
}

/// Sort a batch ascending by timestamp.
///
/// Stable: equal timestamps keep insertion order, which makes the output
/// reproducible run to run.
#[inline]
pub fn sort_batch(events: &mut [Event]) {
    events.sort_by_key(|event| event.timestamp_ns);
}
