use serde::{Deserialize, Serialize};

use contracts::nanos_to_sec_nsec;

/// `builtin_interfaces/Time` (also used for `Duration`)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Time {
    pub sec: i32,
    pub nanosec: u32,
}

impl Time {
    pub fn from_nanos(nanos: u64) -> Self {
        let (sec, nanosec) = nanos_to_sec_nsec(nanos);
        Self { sec, nanosec }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Header {
    pub stamp: Time,
    pub frame_id: String,
}

impl Header {
    pub fn new(timestamp_ns: u64, frame_id: impl Into<String>) -> Self {
        Self {
            stamp: Time::from_nanos(timestamp_ns),
            frame_id: frame_id.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ColorRGBA {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl ColorRGBA {
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque color from 8-bit channels
    pub fn from_rgb8(rgb: [u8; 3]) -> Self {
        Self {
            r: f32::from(rgb[0]) / 255.0,
            g: f32::from(rgb[1]) / 255.0,
            b: f32::from(rgb[2]) / 255.0,
            a: 1.0,
        }
    }
}
