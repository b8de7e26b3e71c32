//! CDR encoding
//!
//! Payload = 4-byte encapsulation header (`CDR_LE`, options 0) followed by
//! the little-endian CDR body.

use byteorder::{LittleEndian, WriteBytesExt};
use cdr_encoding::to_vec;
use serde::Serialize;
use thiserror::Error;

use contracts::{ContractError, Event, MessageSchema, Topic};

/// Encapsulation header, read as a little-endian u32 (bytes `00 01 00 00`)
const CDR_LE_HEADER: u32 = 256;

/// Message encode error
#[derive(Debug, Error)]
pub enum MessageError {
    #[error("cdr serialization failed: {0}")]
    Cdr(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A serializable ROS 2 message with a known schema
pub trait RosMessage: Serialize {
    const SCHEMA: &'static MessageSchema;
}

/// Encode a message into a CDR payload
pub fn encode<M: RosMessage>(message: &M) -> Result<Vec<u8>, MessageError> {
    let body = to_vec::<M, LittleEndian>(message).map_err(|e| MessageError::Cdr(e.to_string()))?;
    let mut buffer = Vec::with_capacity(body.len() + 4);
    buffer.write_u32::<LittleEndian>(CDR_LE_HEADER)?;
    buffer.extend_from_slice(&body);
    Ok(buffer)
}

/// Encode a message into an [`Event`]
///
/// # Errors
/// `ContractError::Encode` naming the topic.
pub fn to_event<M: RosMessage>(
    timestamp_ns: u64,
    topic: &Topic,
    message: &M,
) -> Result<Event, ContractError> {
    let payload =
        encode(message).map_err(|e| ContractError::encode(topic.as_str(), e.to_string()))?;
    Ok(Event::new(timestamp_ns, topic.clone(), M::SCHEMA, payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::std_msgs::Header;
    use crate::geometry_msgs::{Pose, PoseStamped};

    #[test]
    fn test_encapsulation_header() {
        let msg = PoseStamped {
            header: Header::new(1_500_000_000, "map"),
            pose: Pose::identity(),
        };
        let payload = encode(&msg).unwrap();
        assert_eq!(&payload[..4], &[0x00, 0x01, 0x00, 0x00]);
        // sec=1, nanosec=500_000_000
        assert_eq!(&payload[4..8], &1i32.to_le_bytes());
        assert_eq!(&payload[8..12], &500_000_000u32.to_le_bytes());
        // frame_id: length including NUL, then bytes
        assert_eq!(&payload[12..16], &4u32.to_le_bytes());
        assert_eq!(&payload[16..20], b"map\0");
    }

    #[test]
    fn test_to_event_carries_schema() {
        let topic = Topic::new("/pose");
        let msg = PoseStamped {
            header: Header::new(42, "map"),
            pose: Pose::identity(),
        };
        let event = to_event(42, &topic, &msg).unwrap();
        assert_eq!(event.timestamp_ns, 42);
        assert_eq!(event.topic, "/pose");
        assert_eq!(event.schema.name, "geometry_msgs/msg/PoseStamped");
    }
}
