use serde::{Deserialize, Serialize};

use contracts::{MessageSchema, PointCloudData, PointFieldDesc};

use crate::cdr::RosMessage;
use crate::geometry_msgs::{Quaternion, Vector3};
use crate::schema;
use crate::std_msgs::Header;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointField {
    pub name: String,
    pub offset: u32,
    pub datatype: u8,
    pub count: u32,
}

impl From<&PointFieldDesc> for PointField {
    fn from(desc: &PointFieldDesc) -> Self {
        Self {
            name: desc.name.clone(),
            offset: desc.offset,
            datatype: desc.datatype as u8,
            count: desc.count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointCloud2 {
    pub header: Header,
    pub height: u32,
    pub width: u32,
    pub fields: Vec<PointField>,
    pub is_bigendian: bool,
    pub point_step: u32,
    pub row_step: u32,
    #[serde(with = "serde_bytes")]
    pub data: Vec<u8>,
    pub is_dense: bool,
}

impl PointCloud2 {
    /// Unordered cloud (height 1)
    pub fn from_cloud(header: Header, cloud: &PointCloudData) -> Self {
        Self {
            header,
            height: 1,
            width: cloud.num_points,
            fields: cloud.fields.iter().map(PointField::from).collect(),
            is_bigendian: false,
            point_step: cloud.point_step,
            row_step: cloud.point_step.saturating_mul(cloud.num_points),
            data: cloud.data.to_vec(),
            is_dense: true,
        }
    }
}

impl RosMessage for PointCloud2 {
    const SCHEMA: &'static MessageSchema = &schema::POINT_CLOUD2;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressedImage {
    pub header: Header,
    pub format: String,
    #[serde(with = "serde_bytes")]
    pub data: Vec<u8>,
}

impl RosMessage for CompressedImage {
    const SCHEMA: &'static MessageSchema = &schema::COMPRESSED_IMAGE;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RegionOfInterest {
    pub x_offset: u32,
    pub y_offset: u32,
    pub height: u32,
    pub width: u32,
    pub do_rectify: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraInfo {
    pub header: Header,
    pub height: u32,
    pub width: u32,
    pub distortion_model: String,
    pub d: Vec<f64>,
    pub k: [f64; 9],
    pub r: [f64; 9],
    pub p: [f64; 12],
    pub binning_x: u32,
    pub binning_y: u32,
    pub roi: RegionOfInterest,
}

impl CameraInfo {
    /// Rectified pinhole camera: identity rectification, projection `[K | 0]`
    pub fn pinhole(header: Header, width: u32, height: u32, intrinsic: &[[f64; 3]; 3]) -> Self {
        let mut k = [0.0; 9];
        let mut p = [0.0; 12];
        for (row, values) in intrinsic.iter().enumerate() {
            for (col, value) in values.iter().enumerate() {
                k[row * 3 + col] = *value;
                p[row * 4 + col] = *value;
            }
        }
        Self {
            header,
            height,
            width,
            distortion_model: String::new(),
            d: Vec::new(),
            k,
            r: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
            p,
            binning_x: 0,
            binning_y: 0,
            roi: RegionOfInterest::default(),
        }
    }
}

impl RosMessage for CameraInfo {
    const SCHEMA: &'static MessageSchema = &schema::CAMERA_INFO;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Imu {
    pub header: Header,
    pub orientation: Quaternion,
    pub orientation_covariance: [f64; 9],
    pub angular_velocity: Vector3,
    pub angular_velocity_covariance: [f64; 9],
    pub linear_acceleration: Vector3,
    pub linear_acceleration_covariance: [f64; 9],
}

impl RosMessage for Imu {
    const SCHEMA: &'static MessageSchema = &schema::IMU;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NavSatStatus {
    pub status: i8,
    pub service: u16,
}

impl NavSatStatus {
    pub const STATUS_FIX: i8 = 0;
    pub const SERVICE_GPS: u16 = 1;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavSatFix {
    pub header: Header,
    pub status: NavSatStatus,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    pub position_covariance: [f64; 9],
    pub position_covariance_type: u8,
}

impl NavSatFix {
    pub const COVARIANCE_TYPE_UNKNOWN: u8 = 0;
}

impl RosMessage for NavSatFix {
    const SCHEMA: &'static MessageSchema = &schema::NAV_SAT_FIX;
}
