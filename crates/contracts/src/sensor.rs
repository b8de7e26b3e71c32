//! SensorPayload - 解码器输出
//!
//! 解码后的传感器文件，每种输出表示一个变体。

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::{ContractError, SampleData};

/// 解码后的传感器数据
#[derive(Debug, Clone)]
pub enum SensorPayload {
    /// Lidar / radar point cloud
    PointCloud(PointCloudData),

    /// Compressed camera image
    CompressedImage(CompressedImageData),
}

/// Point field datatype (values match `sensor_msgs/PointField`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum PointFieldType {
    Int8 = 1,
    UInt8 = 2,
    Int16 = 3,
    UInt16 = 4,
    Int32 = 5,
    UInt32 = 6,
    Float32 = 7,
    Float64 = 8,
}

impl PointFieldType {
    /// Size in bytes
    pub fn size(self) -> u32 {
        match self {
            Self::Int8 | Self::UInt8 => 1,
            Self::Int16 | Self::UInt16 => 2,
            Self::Int32 | Self::UInt32 | Self::Float32 => 4,
            Self::Float64 => 8,
        }
    }
}

/// Layout of one point field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointFieldDesc {
    pub name: String,
    pub offset: u32,
    pub datatype: PointFieldType,
    pub count: u32,
}

impl PointFieldDesc {
    pub fn new(name: &str, offset: u32, datatype: PointFieldType, count: u32) -> Self {
        Self {
            name: name.to_string(),
            offset,
            datatype,
            count,
        }
    }
}

/// Point cloud (unordered, little-endian, dense rows)
#[derive(Debug, Clone)]
pub struct PointCloudData {
    /// Number of points
    pub num_points: u32,

    /// Bytes per point
    pub point_step: u32,

    /// Field layout
    pub fields: Vec<PointFieldDesc>,

    /// Packed point data
    pub data: Bytes,
}

impl PointCloudData {
    fn float_offset(&self, name: &str) -> Option<usize> {
        self.fields
            .iter()
            .find(|f| f.name == name && f.datatype == PointFieldType::Float32)
            .map(|f| f.offset as usize)
    }

    /// Iterate `[x, y, z]` of every point.
    ///
    /// Empty when the cloud has no float32 x/y/z fields.
    pub fn xyz(&self) -> impl Iterator<Item = [f32; 3]> + '_ {
        let offsets = match (
            self.float_offset("x"),
            self.float_offset("y"),
            self.float_offset("z"),
        ) {
            (Some(x), Some(y), Some(z)) => Some([x, y, z]),
            _ => None,
        };
        let step = self.point_step as usize;

        self.data
            .chunks_exact(step.max(1))
            .take(if offsets.is_some() { self.num_points as usize } else { 0 })
            .filter_map(move |point| {
                let offsets = offsets?;
                let read = |o: usize| {
                    point
                        .get(o..o + 4)
                        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                };
                Some([read(offsets[0])?, read(offsets[1])?, read(offsets[2])?])
            })
    }
}

/// Compressed image bytes
#[derive(Debug, Clone)]
pub struct CompressedImageData {
    /// `jpeg` / `png`
    pub format: String,

    /// Encoded image
    pub data: Bytes,
}

/// Payload decoder collaborator
///
/// Resolves a record's file reference and decodes it according to the
/// record's modality. Each call may do blocking file I/O.
pub trait PayloadSource {
    /// # Errors
    /// `ContractError::PayloadDecode` for a missing or corrupt file.
    fn load(&self, record: &SampleData) -> Result<SensorPayload, ContractError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cloud(points: &[[f32; 4]]) -> PointCloudData {
        let mut data = Vec::new();
        for p in points {
            for v in p {
                data.extend_from_slice(&v.to_le_bytes());
            }
        }
        PointCloudData {
            num_points: points.len() as u32,
            point_step: 16,
            fields: vec![
                PointFieldDesc::new("x", 0, PointFieldType::Float32, 1),
                PointFieldDesc::new("y", 4, PointFieldType::Float32, 1),
                PointFieldDesc::new("z", 8, PointFieldType::Float32, 1),
                PointFieldDesc::new("intensity", 12, PointFieldType::Float32, 1),
            ],
            data: Bytes::from(data),
        }
    }

    #[test]
    fn test_xyz_iterates_points() {
        let pc = cloud(&[[1.0, 2.0, 3.0, 9.0], [4.0, 5.0, 6.0, 9.0]]);
        let points: Vec<[f32; 3]> = pc.xyz().collect();
        assert_eq!(points, vec![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
    }

    #[test]
    fn test_xyz_without_fields_is_empty() {
        let mut pc = cloud(&[[1.0, 2.0, 3.0, 9.0]]);
        pc.fields.retain(|f| f.name != "z");
        assert_eq!(pc.xyz().count(), 0);
    }

    #[test]
    fn test_field_sizes() {
        assert_eq!(PointFieldType::Float64.size(), 8);
        assert_eq!(PointFieldType::Int16.size(), 2);
        assert_eq!(PointFieldType::Float32 as u8, 7);
    }
}
