use serde::{Deserialize, Serialize};

use contracts::{GridMap, MessageSchema};

use crate::cdr::RosMessage;
use crate::geometry_msgs::{Pose, PoseWithCovariance, TwistWithCovariance};
use crate::schema;
use crate::std_msgs::{Header, Time};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Odometry {
    pub header: Header,
    pub child_frame_id: String,
    pub pose: PoseWithCovariance,
    pub twist: TwistWithCovariance,
}

impl RosMessage for Odometry {
    const SCHEMA: &'static MessageSchema = &schema::ODOMETRY;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapMetaData {
    pub map_load_time: Time,
    pub resolution: f32,
    pub width: u32,
    pub height: u32,
    pub origin: Pose,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OccupancyGrid {
    pub header: Header,
    pub info: MapMetaData,
    pub data: Vec<i8>,
}

impl OccupancyGrid {
    pub fn from_grid(header: Header, grid: &GridMap) -> Self {
        Self {
            info: MapMetaData {
                map_load_time: header.stamp,
                resolution: grid.resolution,
                width: grid.width,
                height: grid.height,
                origin: Pose::new([grid.origin[0], grid.origin[1], 0.0], [1.0, 0.0, 0.0, 0.0]),
            },
            header,
            data: grid.data.clone(),
        }
    }
}

impl RosMessage for OccupancyGrid {
    const SCHEMA: &'static MessageSchema = &schema::OCCUPANCY_GRID;
}
