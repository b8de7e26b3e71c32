//! 3D markers and image-space markers.
//!
//! `ImageMarkerArray` lives in `foxglove_msgs`; it wraps the ROS
//! `visualization_msgs/ImageMarker` type.

use serde::{Deserialize, Serialize};

use contracts::MessageSchema;

use crate::cdr::RosMessage;
use crate::geometry_msgs::{Point, Pose, Vector3};
use crate::schema;
use crate::std_msgs::{ColorRGBA, Header, Time};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub header: Header,
    pub ns: String,
    pub id: i32,
    #[serde(rename = "type")]
    pub marker_type: i32,
    pub action: i32,
    pub pose: Pose,
    pub scale: Vector3,
    pub color: ColorRGBA,
    pub lifetime: Time,
    pub frame_locked: bool,
    pub points: Vec<Point>,
    pub colors: Vec<ColorRGBA>,
    pub text: String,
    pub mesh_resource: String,
    pub mesh_use_embedded_materials: bool,
}

impl Marker {
    pub const CUBE: i32 = 1;
    pub const LINE_STRIP: i32 = 4;
    pub const ADD: i32 = 0;

    /// Marker with every optional field empty
    pub fn new(header: Header, ns: &str, id: i32, marker_type: i32) -> Self {
        Self {
            header,
            ns: ns.to_string(),
            id,
            marker_type,
            action: Self::ADD,
            pose: Pose::identity(),
            scale: Vector3::default(),
            color: ColorRGBA::default(),
            lifetime: Time::default(),
            frame_locked: false,
            points: Vec::new(),
            colors: Vec::new(),
            text: String::new(),
            mesh_resource: String::new(),
            mesh_use_embedded_materials: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarkerArray {
    pub markers: Vec<Marker>,
}

impl RosMessage for MarkerArray {
    const SCHEMA: &'static MessageSchema = &schema::MARKER_ARRAY;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageMarker {
    pub header: Header,
    pub ns: String,
    pub id: i32,
    #[serde(rename = "type")]
    pub marker_type: i32,
    pub action: i32,
    pub position: Point,
    pub scale: f32,
    pub outline_color: ColorRGBA,
    pub filled: u8,
    pub fill_color: ColorRGBA,
    pub lifetime: Time,
    pub points: Vec<Point>,
    pub outline_colors: Vec<ColorRGBA>,
}

impl ImageMarker {
    pub const POINTS: i32 = 4;
    pub const ADD: i32 = 0;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageMarkerArray {
    pub markers: Vec<ImageMarker>,
}

impl RosMessage for ImageMarkerArray {
    const SCHEMA: &'static MessageSchema = &schema::IMAGE_MARKER_ARRAY;
}
