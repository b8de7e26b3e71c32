//! Lidar sweep adapter (`.pcd.bin`)

use bytemuck::{Pod, Zeroable};
use bytes::Bytes;
use contracts::{PointCloudData, PointFieldDesc, PointFieldType, SensorPayload};

use crate::error::{IngestionError, Result};

/// One lidar return as stored on disk (little-endian f32 x5)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LidarPoint {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub intensity: f32,
    pub ring: f32,
}

/// Bytes per point
pub const POINT_STEP: u32 = std::mem::size_of::<LidarPoint>() as u32;

/// Field layout of [`LidarPoint`]
pub fn fields() -> Vec<PointFieldDesc> {
    ["x", "y", "z", "intensity", "ring"]
        .iter()
        .enumerate()
        .map(|(i, name)| PointFieldDesc::new(name, i as u32 * 4, PointFieldType::Float32, 1))
        .collect()
}

/// Wrap a sweep file as an unordered cloud
pub fn decode(raw: Bytes) -> Result<SensorPayload> {
    let step = POINT_STEP as usize;
    if raw.len() % step != 0 {
        return Err(IngestionError::LengthMismatch {
            expected: raw.len() / step * step,
            actual: raw.len(),
        });
    }
    Ok(SensorPayload::PointCloud(PointCloudData {
        num_points: (raw.len() / step) as u32,
        point_step: POINT_STEP,
        fields: fields(),
        data: raw,
    }))
}

/// Serialize points into the on-disk layout
pub fn encode(points: &[LidarPoint]) -> Bytes {
    Bytes::copy_from_slice(bytemuck::cast_slice(points))
}
