//! Dataset records and the reader contract
//!
//! Records are read-only views resolved by the reader: links are `Option`s
//! (the on-disk empty string becomes `None`), sensor channel and modality are
//! attached to every `SampleData`.
//!
//! ## Time Model
//! - On-disk timestamps are microseconds since the epoch
//! - Everything leaving this crate is converted with [`micros_to_nanos`]

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{micros_to_nanos, ContractError, Timestamped};

/// Record token (32 hex chars in nuScenes)
pub type Token = String;

/// Sensor modality
///
/// Closed set: every sensor channel in the dataset is one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorModality {
    Lidar,
    Camera,
    Radar,
}

impl SensorModality {
    /// Parse the dataset's modality string
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "lidar" => Some(Self::Lidar),
            "camera" => Some(Self::Camera),
            "radar" => Some(Self::Radar),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lidar => "lidar",
            Self::Camera => "camera",
            Self::Radar => "radar",
        }
    }
}

/// Scene: a named chain of keyframes
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub token: Token,
    pub name: String,
    pub description: String,
    pub log_token: Token,
    pub nbr_samples: u32,
    pub first_sample_token: Token,
    pub last_sample_token: Token,
}

/// Keyframe sample
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub token: Token,
    /// Microseconds
    pub timestamp: u64,
    pub scene_token: Token,
    pub prev: Option<Token>,
    pub next: Option<Token>,
    /// Channel name -> keyframe sample_data token (sorted by channel)
    pub data: BTreeMap<String, Token>,
    /// Annotation tokens attached to this keyframe
    pub anns: Vec<Token>,
}

/// One sensor record, keyframe or not
#[derive(Debug, Clone, PartialEq)]
pub struct SampleData {
    pub token: Token,
    pub sample_token: Token,
    pub ego_pose_token: Token,
    pub calibrated_sensor_token: Token,
    /// Microseconds
    pub timestamp: u64,
    pub fileformat: String,
    pub is_key_frame: bool,
    pub height: u32,
    pub width: u32,
    /// Path relative to the dataset root
    pub filename: String,
    pub prev: Option<Token>,
    pub next: Option<Token>,
    pub channel: String,
    pub modality: SensorModality,
}

impl Timestamped for SampleData {
    fn timestamp_ns(&self) -> u64 {
        micros_to_nanos(self.timestamp)
    }
}

/// Vehicle pose in the global (map) frame
#[derive(Debug, Clone, PartialEq)]
pub struct EgoPose {
    pub token: Token,
    /// Microseconds
    pub timestamp: u64,
    pub translation: [f64; 3],
    /// Quaternion, `[w, x, y, z]`
    pub rotation: [f64; 4],
}

impl Timestamped for EgoPose {
    fn timestamp_ns(&self) -> u64 {
        micros_to_nanos(self.timestamp)
    }
}

/// Sensor extrinsics (relative to the ego frame) and intrinsics
#[derive(Debug, Clone, PartialEq)]
pub struct CalibratedSensor {
    pub token: Token,
    pub sensor_token: Token,
    pub translation: [f64; 3],
    /// Quaternion, `[w, x, y, z]`
    pub rotation: [f64; 4],
    /// 3x3 row-major camera matrix; `None` for non-camera sensors
    pub camera_intrinsic: Option<[[f64; 3]; 3]>,
}

/// Recording log (vehicle, location)
#[derive(Debug, Clone, PartialEq)]
pub struct Log {
    pub token: Token,
    pub logfile: String,
    pub vehicle: String,
    pub date_captured: String,
    pub location: String,
}

/// 3D box annotation attached to a keyframe
#[derive(Debug, Clone, PartialEq)]
pub struct SampleAnnotation {
    pub token: Token,
    pub sample_token: Token,
    pub instance_token: Token,
    /// Resolved through instance -> category
    pub category_name: String,
    pub translation: [f64; 3],
    /// width, length, height
    pub size: [f64; 3],
    /// Quaternion, `[w, x, y, z]`
    pub rotation: [f64; 4],
    pub num_lidar_pts: u32,
    pub num_radar_pts: u32,
}

/// Dataset reader
///
/// All access is by token. Implementations hold the whole metadata set in
/// memory; nothing here touches payload files.
pub trait DatasetReader {
    /// Dataset version name (e.g. `v1.0-mini`)
    fn version(&self) -> &str;

    /// All scenes in dataset order
    fn scenes(&self) -> &[Scene];

    fn sample(&self, token: &str) -> Result<&Sample, ContractError>;

    fn sample_data(&self, token: &str) -> Result<&SampleData, ContractError>;

    fn ego_pose(&self, token: &str) -> Result<&EgoPose, ContractError>;

    fn calibrated_sensor(&self, token: &str) -> Result<&CalibratedSensor, ContractError>;

    fn log(&self, token: &str) -> Result<&Log, ContractError>;

    fn sample_annotation(&self, token: &str) -> Result<&SampleAnnotation, ContractError>;

    /// Find a scene by name
    fn scene_by_name(&self, name: &str) -> Option<&Scene> {
        self.scenes().iter().find(|scene| scene.name == name)
    }

    /// Keyframes of a scene in chain order (first -> next -> ...)
    ///
    /// # Errors
    /// Missing sample tokens, samples that belong to another scene, or a chain
    /// longer than the scene's declared sample count (a cycle).
    fn scene_samples(&self, scene: &Scene) -> Result<Vec<&Sample>, ContractError> {
        let limit = (scene.nbr_samples as usize).max(1);
        let mut samples = Vec::with_capacity(limit);
        let mut cursor = Some(scene.first_sample_token.as_str());

        while let Some(token) = cursor {
            let sample = self.sample(token)?;
            if sample.scene_token != scene.token {
                return Err(ContractError::malformed_link(
                    "sample",
                    token,
                    format!("belongs to scene '{}', not '{}'", sample.scene_token, scene.token),
                ));
            }
            if samples.len() >= limit {
                return Err(ContractError::malformed_link(
                    "sample",
                    token,
                    format!("chain exceeds the scene's {} samples", scene.nbr_samples),
                ));
            }
            samples.push(sample);
            cursor = sample.next.as_deref();
        }

        Ok(samples)
    }

    /// Ego pose recorded with a sample_data record
    fn ego_pose_of(&self, record: &SampleData) -> Result<&EgoPose, ContractError> {
        self.ego_pose(&record.ego_pose_token)
    }

    /// Keyframe sample_data of `channel` in `sample`, if the channel is present
    fn keyframe_record(
        &self,
        sample: &Sample,
        channel: &str,
    ) -> Result<Option<&SampleData>, ContractError> {
        sample
            .data
            .get(channel)
            .map(|token| self.sample_data(token))
            .transpose()
    }
}
