//! In-memory collaborators
//!
//! Used for tests and dry runs without a dataset on disk. The builder lays
//! out channel chains the way nuScenes does: every channel is one linked
//! list across the scene, keyframes flagged, sweeps in between.

use std::collections::{BTreeMap, HashMap, HashSet};

use bytes::Bytes;
use contracts::{
    BusMessage, CalibratedSensor, CanBusReader, CompressedImageData, ContractError,
    DatasetReader, EgoPose, Log, PayloadSource, Sample, SampleAnnotation, SampleData, Scene,
    SensorModality, SensorPayload,
};

use crate::adapters::{lidar, radar};
use crate::adapters::lidar::LidarPoint;

/// Pinhole intrinsic used for mock cameras (1600 x 900)
pub const MOCK_INTRINSIC: [[f64; 3]; 3] = [
    [1266.4, 0.0, 816.3],
    [0.0, 1266.4, 491.5],
    [0.0, 0.0, 1.0],
];

/// In-memory dataset
#[derive(Debug, Default)]
pub struct MemoryDataset {
    version: String,
    scenes: Vec<Scene>,
    samples: HashMap<String, Sample>,
    sample_data: HashMap<String, SampleData>,
    ego_poses: HashMap<String, EgoPose>,
    calibrated_sensors: HashMap<String, CalibratedSensor>,
    logs: HashMap<String, Log>,
    annotations: HashMap<String, SampleAnnotation>,
}

impl MemoryDataset {
    pub fn builder(version: &str) -> MemoryDatasetBuilder {
        MemoryDatasetBuilder {
            version: version.to_string(),
            scenes: Vec::new(),
        }
    }

    /// Drop a sample_data record (dangling links are left in place)
    pub fn remove_sample_data(&mut self, token: &str) -> Option<SampleData> {
        self.sample_data.remove(token)
    }

    /// Mutable access for link corruption in tests
    pub fn sample_mut(&mut self, token: &str) -> Option<&mut Sample> {
        self.samples.get_mut(token)
    }

    /// All sample_data tokens of a channel in chain order
    pub fn channel_tokens(&self, scene_name: &str, channel: &str) -> Vec<String> {
        let mut records: Vec<&SampleData> = self
            .sample_data
            .values()
            .filter(|sd| sd.channel == channel && sd.token.starts_with(&format!("{scene_name}/")))
            .collect();
        records.sort_by_key(|sd| sd.timestamp);
        records.into_iter().map(|sd| sd.token.clone()).collect()
    }
}

fn lookup<'a, T>(
    map: &'a HashMap<String, T>,
    table: &'static str,
    token: &str,
) -> Result<&'a T, ContractError> {
    map.get(token).ok_or_else(|| ContractError::missing(table, token))
}

impl DatasetReader for MemoryDataset {
    fn version(&self) -> &str {
        &self.version
    }

    fn scenes(&self) -> &[Scene] {
        &self.scenes
    }

    fn sample(&self, token: &str) -> Result<&Sample, ContractError> {
        lookup(&self.samples, "sample", token)
    }

    fn sample_data(&self, token: &str) -> Result<&SampleData, ContractError> {
        lookup(&self.sample_data, "sample_data", token)
    }

    fn ego_pose(&self, token: &str) -> Result<&EgoPose, ContractError> {
        lookup(&self.ego_poses, "ego_pose", token)
    }

    fn calibrated_sensor(&self, token: &str) -> Result<&CalibratedSensor, ContractError> {
        lookup(&self.calibrated_sensors, "calibrated_sensor", token)
    }

    fn log(&self, token: &str) -> Result<&Log, ContractError> {
        lookup(&self.logs, "log", token)
    }

    fn sample_annotation(&self, token: &str) -> Result<&SampleAnnotation, ContractError> {
        lookup(&self.annotations, "sample_annotation", token)
    }
}

/// Scene layout under construction
#[derive(Debug, Clone)]
pub struct SceneSpec {
    name: String,
    location: String,
    channels: Vec<(String, SensorModality)>,
    /// Keyframe sample timestamps (microseconds)
    keyframes: Vec<u64>,
    /// `(channel, timestamp, is_key_frame)`
    records: Vec<(String, u64, bool)>,
    /// `(keyframe index, category, translation)`
    annotations: Vec<(usize, String, [f64; 3])>,
}

impl SceneSpec {
    /// Add a sensor channel
    pub fn channel(mut self, name: &str, modality: SensorModality) -> Self {
        self.channels.push((name.to_string(), modality));
        self
    }

    /// Add a keyframe at `timestamp`; every channel gets a keyframe record
    /// at the same time
    pub fn keyframe(mut self, timestamp: u64) -> Self {
        self.keyframes.push(timestamp);
        for (channel, _) in &self.channels {
            self.records.push((channel.clone(), timestamp, true));
        }
        self
    }

    /// Add a keyframe with explicit per-channel record times
    pub fn keyframe_at(mut self, timestamp: u64, records: &[(&str, u64)]) -> Self {
        self.keyframes.push(timestamp);
        for (channel, ts) in records {
            self.records.push((channel.to_string(), *ts, true));
        }
        self
    }

    /// Add a non-keyframe record
    pub fn sweep(mut self, channel: &str, timestamp: u64) -> Self {
        self.records.push((channel.to_string(), timestamp, false));
        self
    }

    /// Attach a box annotation to the most recent keyframe
    pub fn annotation(mut self, category: &str, translation: [f64; 3]) -> Self {
        let index = self.keyframes.len().saturating_sub(1);
        self.annotations
            .push((index, category.to_string(), translation));
        self
    }
}

/// Builder for [`MemoryDataset`]
#[derive(Debug)]
pub struct MemoryDatasetBuilder {
    version: String,
    scenes: Vec<SceneSpec>,
}

impl MemoryDatasetBuilder {
    /// Add a scene; `layout` declares channels, keyframes and sweeps in order
    pub fn scene(
        mut self,
        name: &str,
        location: &str,
        layout: impl FnOnce(SceneSpec) -> SceneSpec,
    ) -> Self {
        let spec = SceneSpec {
            name: name.to_string(),
            location: location.to_string(),
            channels: Vec::new(),
            keyframes: Vec::new(),
            records: Vec::new(),
            annotations: Vec::new(),
        };
        self.scenes.push(layout(spec));
        self
    }

    /// Tokens are readable paths: `<scene>/<table-or-channel>/<index>`.
    pub fn build(self) -> MemoryDataset {
        let mut ds = MemoryDataset {
            version: self.version,
            ..Default::default()
        };

        for spec in self.scenes {
            let scene_token = format!("{}/scene", spec.name);
            let log_token = format!("{}/log", spec.name);
            ds.logs.insert(
                log_token.clone(),
                Log {
                    token: log_token.clone(),
                    logfile: format!("{}-log", spec.name),
                    vehicle: "n015".to_string(),
                    date_captured: "2018-07-24".to_string(),
                    location: spec.location.clone(),
                },
            );

            let sample_tokens: Vec<String> = (0..spec.keyframes.len())
                .map(|i| format!("{}/sample/{i}", spec.name))
                .collect();
            for (i, ts) in spec.keyframes.iter().enumerate() {
                let token = sample_tokens[i].clone();
                ds.samples.insert(
                    token.clone(),
                    Sample {
                        token,
                        timestamp: *ts,
                        scene_token: scene_token.clone(),
                        prev: i.checked_sub(1).map(|p| sample_tokens[p].clone()),
                        next: sample_tokens.get(i + 1).cloned(),
                        data: BTreeMap::new(),
                        anns: Vec::new(),
                    },
                );
            }

            for (channel, modality) in &spec.channels {
                let calib_token = format!("{}/calibrated_sensor/{channel}", spec.name);
                ds.calibrated_sensors.insert(
                    calib_token.clone(),
                    CalibratedSensor {
                        token: calib_token.clone(),
                        sensor_token: format!("sensor/{channel}"),
                        translation: [1.0, 0.0, 1.5],
                        rotation: [1.0, 0.0, 0.0, 0.0],
                        camera_intrinsic: (*modality == SensorModality::Camera)
                            .then_some(MOCK_INTRINSIC),
                    },
                );

                let mut chain: Vec<(u64, bool)> = spec
                    .records
                    .iter()
                    .filter(|(c, _, _)| c == channel)
                    .map(|(_, ts, key)| (*ts, *key))
                    .collect();
                chain.sort_by_key(|(ts, _)| *ts);

                let tokens: Vec<String> = (0..chain.len())
                    .map(|i| format!("{}/{channel}/{i}", spec.name))
                    .collect();
                for (i, (ts, is_key_frame)) in chain.iter().enumerate() {
                    // owning sample: the latest keyframe at or before this record
                    let sample_index = spec
                        .keyframes
                        .iter()
                        .rposition(|k| k <= ts)
                        .unwrap_or(0);
                    let sample_token = sample_tokens.get(sample_index).cloned().unwrap_or_default();
                    let token = tokens[i].clone();
                    let ego_token = format!("{token}/ego_pose");

                    if *is_key_frame {
                        if let Some(sample) = ds.samples.get_mut(&sample_token) {
                            sample.data.insert(channel.clone(), token.clone());
                        }
                    }
                    ds.ego_poses.insert(
                        ego_token.clone(),
                        EgoPose {
                            token: ego_token.clone(),
                            timestamp: *ts,
                            // 10 m/s along x, starting at (600, 1600)
                            translation: [600.0 + *ts as f64 * 1e-5, 1600.0, 0.0],
                            rotation: [1.0, 0.0, 0.0, 0.0],
                        },
                    );
                    let (filename, fileformat, width, height) = match modality {
                        SensorModality::Camera => {
                            (format!("samples/{channel}/{i}.jpg"), "jpg", 1600, 900)
                        }
                        SensorModality::Lidar => {
                            (format!("samples/{channel}/{i}.pcd.bin"), "pcd", 0, 0)
                        }
                        SensorModality::Radar => {
                            (format!("samples/{channel}/{i}.pcd"), "pcd", 0, 0)
                        }
                    };
                    ds.sample_data.insert(
                        token.clone(),
                        SampleData {
                            token,
                            sample_token,
                            ego_pose_token: ego_token,
                            calibrated_sensor_token: calib_token.clone(),
                            timestamp: *ts,
                            fileformat: fileformat.to_string(),
                            is_key_frame: *is_key_frame,
                            height,
                            width,
                            filename,
                            prev: i.checked_sub(1).map(|p| tokens[p].clone()),
                            next: tokens.get(i + 1).cloned(),
                            channel: channel.clone(),
                            modality: *modality,
                        },
                    );
                }
            }

            for (i, (keyframe, category, translation)) in spec.annotations.iter().enumerate() {
                let token = format!("{}/annotation/{i}", spec.name);
                let Some(sample_token) = sample_tokens.get(*keyframe) else {
                    continue;
                };
                if let Some(sample) = ds.samples.get_mut(sample_token) {
                    sample.anns.push(token.clone());
                }
                ds.annotations.insert(
                    token.clone(),
                    SampleAnnotation {
                        token,
                        sample_token: sample_token.clone(),
                        instance_token: format!("{}/instance/{i}", spec.name),
                        category_name: category.clone(),
                        translation: *translation,
                        size: [1.9, 4.5, 1.6],
                        rotation: [1.0, 0.0, 0.0, 0.0],
                        num_lidar_pts: 10,
                        num_radar_pts: 0,
                    },
                );
            }

            ds.scenes.push(Scene {
                token: scene_token,
                name: spec.name.clone(),
                description: format!("mock scene {}", spec.name),
                log_token,
                nbr_samples: spec.keyframes.len() as u32,
                first_sample_token: sample_tokens.first().cloned().unwrap_or_default(),
                last_sample_token: sample_tokens.last().cloned().unwrap_or_default(),
            });
        }

        ds
    }
}

/// In-memory CAN bus
#[derive(Debug, Default, Clone)]
pub struct MemoryCanBus {
    groups: HashMap<(String, String), Vec<BusMessage>>,
}

impl MemoryCanBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_messages(mut self, scene: &str, group: &str, messages: Vec<BusMessage>) -> Self {
        self.groups
            .insert((scene.to_string(), group.to_string()), messages);
        self
    }
}

impl CanBusReader for MemoryCanBus {
    fn messages(&self, scene_name: &str, group: &str) -> Result<Vec<BusMessage>, ContractError> {
        let mut messages = self
            .groups
            .get(&(scene_name.to_string(), group.to_string()))
            .cloned()
            .unwrap_or_default();
        messages.sort_by_key(|m| m.utime);
        Ok(messages)
    }
}

/// Synthetic payloads with injectable failures
#[derive(Debug, Default, Clone)]
pub struct MemoryPayloadSource {
    failing: HashSet<String>,
}

impl MemoryPayloadSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make loading the record with `token` fail
    pub fn fail_on(mut self, token: &str) -> Self {
        self.failing.insert(token.to_string());
        self
    }

    fn lidar_sweep() -> Bytes {
        let points: Vec<LidarPoint> = (0..16)
            .map(|i| {
                let angle = i as f32 * std::f32::consts::PI / 8.0;
                LidarPoint {
                    x: 10.0 * angle.cos(),
                    y: 10.0 * angle.sin(),
                    z: 0.5,
                    intensity: i as f32,
                    ring: (i % 32) as f32,
                }
            })
            .collect();
        lidar::encode(&points)
    }

    fn radar_pcd() -> Bytes {
        let mut raw = b"VERSION 0.7\nFIELDS x y z\nSIZE 4 4 4\nTYPE F F F\nCOUNT 1 1 1\n\
                        WIDTH 1\nHEIGHT 1\nPOINTS 1\nDATA binary\n"
            .to_vec();
        for v in [25.0f32, 1.0, 0.0] {
            raw.extend_from_slice(&v.to_le_bytes());
        }
        Bytes::from(raw)
    }
}

impl PayloadSource for MemoryPayloadSource {
    fn load(&self, record: &SampleData) -> Result<SensorPayload, ContractError> {
        if self.failing.contains(&record.token) {
            return Err(ContractError::payload_decode(
                &record.channel,
                &record.filename,
                "injected failure",
            ));
        }
        let decoded = match record.modality {
            SensorModality::Lidar => lidar::decode(Self::lidar_sweep()),
            SensorModality::Radar => radar::decode(Self::radar_pcd()),
            SensorModality::Camera => Ok(SensorPayload::CompressedImage(CompressedImageData {
                format: "jpeg".to_string(),
                data: Bytes::from_static(&[0xFF, 0xD8, 0xFF, 0xD9]),
            })),
        };
        decoded.map_err(|e| e.into_decode(&record.channel, &record.filename))
    }
}
