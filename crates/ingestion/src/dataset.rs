//! nuScenes metadata reader
//!
//! Loads every table of one dataset version into token-keyed maps and
//! resolves the derived fields the converter needs (sample channel map,
//! annotation lists, sensor channel/modality, category names).

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use contracts::{
    CalibratedSensor, ContractError, DatasetReader, EgoPose, Log, Sample, SampleAnnotation,
    SampleData, Scene, SensorModality,
};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::error::{IngestionError, Result};
use crate::tables::{self, *};

/// On-disk nuScenes dataset (`<root>/<version>/*.json`)
pub struct NuScenesDataset {
    root: PathBuf,
    version: String,
    scenes: Vec<Scene>,
    samples: HashMap<String, Sample>,
    sample_data: HashMap<String, SampleData>,
    ego_poses: HashMap<String, EgoPose>,
    calibrated_sensors: HashMap<String, CalibratedSensor>,
    logs: HashMap<String, Log>,
    annotations: HashMap<String, SampleAnnotation>,
}

impl NuScenesDataset {
    /// Open one version.
    ///
    /// # Errors
    /// `ContractError::DatasetOpen` when the version directory is missing or
    /// a table cannot be read.
    pub fn open(root: impl AsRef<Path>, version: &str) -> std::result::Result<Self, ContractError> {
        let root = root.as_ref().to_path_buf();
        let open_error = |message: String| ContractError::DatasetOpen {
            root: root.display().to_string(),
            version: version.to_string(),
            message,
        };

        let table_dir = root.join(version);
        if !table_dir.is_dir() {
            return Err(open_error(format!(
                "version directory {} not found",
                table_dir.display()
            )));
        }

        Self::load(root.clone(), version, &table_dir).map_err(|e| open_error(e.to_string()))
    }

    fn load(root: PathBuf, version: &str, dir: &Path) -> Result<Self> {
        let scene_rows: Vec<SceneRow> = read_table(dir, "scene")?;
        let sample_rows: Vec<SampleRow> = read_table(dir, "sample")?;
        let sample_data_rows: Vec<SampleDataRow> = read_table(dir, "sample_data")?;
        let ego_rows: Vec<EgoPoseRow> = read_table(dir, "ego_pose")?;
        let calib_rows: Vec<CalibratedSensorRow> = read_table(dir, "calibrated_sensor")?;
        let sensor_rows: Vec<SensorRow> = read_table(dir, "sensor")?;
        let log_rows: Vec<LogRow> = read_table(dir, "log")?;
        let ann_rows: Vec<SampleAnnotationRow> = read_table(dir, "sample_annotation")?;
        let instance_rows: Vec<InstanceRow> = read_table(dir, "instance")?;
        let category_rows: Vec<CategoryRow> = read_table(dir, "category")?;

        let scenes = scene_rows
            .into_iter()
            .map(|row| Scene {
                token: row.token,
                name: row.name,
                description: row.description,
                log_token: row.log_token,
                nbr_samples: row.nbr_samples,
                first_sample_token: row.first_sample_token,
                last_sample_token: row.last_sample_token,
            })
            .collect::<Vec<_>>();

        let mut samples: HashMap<String, Sample> = sample_rows
            .into_iter()
            .map(|row| {
                let sample = Sample {
                    token: row.token.clone(),
                    timestamp: row.timestamp,
                    scene_token: row.scene_token,
                    prev: tables::link(row.prev),
                    next: tables::link(row.next),
                    data: Default::default(),
                    anns: Vec::new(),
                };
                (row.token, sample)
            })
            .collect();

        let sensors: HashMap<String, (String, Option<SensorModality>)> = sensor_rows
            .into_iter()
            .map(|row| {
                let modality = SensorModality::parse(&row.modality);
                (row.token, (row.channel, modality))
            })
            .collect();

        let calibrated_sensors: HashMap<String, CalibratedSensor> = calib_rows
            .into_iter()
            .map(|row| {
                let calib = CalibratedSensor {
                    token: row.token.clone(),
                    sensor_token: row.sensor_token,
                    translation: row.translation,
                    rotation: row.rotation,
                    camera_intrinsic: tables::intrinsic(&row.camera_intrinsic),
                };
                (row.token, calib)
            })
            .collect();

        let mut sample_data = HashMap::with_capacity(sample_data_rows.len());
        let mut unresolved = 0usize;
        for row in sample_data_rows {
            let sensor = calibrated_sensors
                .get(&row.calibrated_sensor_token)
                .and_then(|calib| sensors.get(&calib.sensor_token));
            let Some((channel, Some(modality))) = sensor else {
                // Lookups of this token will report it missing.
                unresolved += 1;
                continue;
            };

            if row.is_key_frame {
                if let Some(sample) = samples.get_mut(&row.sample_token) {
                    sample.data.insert(channel.clone(), row.token.clone());
                }
            }

            sample_data.insert(
                row.token.clone(),
                SampleData {
                    token: row.token,
                    sample_token: row.sample_token,
                    ego_pose_token: row.ego_pose_token,
                    calibrated_sensor_token: row.calibrated_sensor_token,
                    timestamp: row.timestamp,
                    fileformat: row.fileformat,
                    is_key_frame: row.is_key_frame,
                    height: row.height,
                    width: row.width,
                    filename: row.filename,
                    prev: tables::link(row.prev),
                    next: tables::link(row.next),
                    channel: channel.clone(),
                    modality: *modality,
                },
            );
        }
        if unresolved > 0 {
            warn!(
                version,
                count = unresolved,
                "sample_data records without a known sensor were dropped"
            );
        }

        let categories: HashMap<String, String> = category_rows
            .into_iter()
            .map(|row| (row.token, row.name))
            .collect();
        let instance_category: HashMap<String, String> = instance_rows
            .into_iter()
            .filter_map(|row| {
                categories
                    .get(&row.category_token)
                    .map(|name| (row.token, name.clone()))
            })
            .collect();

        let mut annotations = HashMap::with_capacity(ann_rows.len());
        for row in ann_rows {
            let Some(category_name) = instance_category.get(&row.instance_token) else {
                warn!(token = %row.token, "annotation without category dropped");
                continue;
            };
            if let Some(sample) = samples.get_mut(&row.sample_token) {
                sample.anns.push(row.token.clone());
            }
            annotations.insert(
                row.token.clone(),
                SampleAnnotation {
                    token: row.token,
                    sample_token: row.sample_token,
                    instance_token: row.instance_token,
                    category_name: category_name.clone(),
                    translation: row.translation,
                    size: row.size,
                    rotation: row.rotation,
                    num_lidar_pts: row.num_lidar_pts,
                    num_radar_pts: row.num_radar_pts,
                },
            );
        }

        let ego_poses = ego_rows
            .into_iter()
            .map(|row| {
                let pose = EgoPose {
                    token: row.token.clone(),
                    timestamp: row.timestamp,
                    translation: row.translation,
                    rotation: row.rotation,
                };
                (row.token, pose)
            })
            .collect();

        let logs = log_rows
            .into_iter()
            .map(|row| {
                let log = Log {
                    token: row.token.clone(),
                    logfile: row.logfile,
                    vehicle: row.vehicle,
                    date_captured: row.date_captured,
                    location: row.location,
                };
                (row.token, log)
            })
            .collect();

        info!(
            version,
            scenes = scenes.len(),
            samples = samples.len(),
            sample_data = sample_data.len(),
            annotations = annotations.len(),
            "dataset loaded"
        );

        Ok(Self {
            root,
            version: version.to_string(),
            scenes,
            samples,
            sample_data,
            ego_poses,
            calibrated_sensors,
            logs,
            annotations,
        })
    }

    /// Dataset root (payload file names are relative to it)
    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn read_table<T: DeserializeOwned>(dir: &Path, table: &'static str) -> Result<Vec<T>> {
    let path = dir.join(format!("{table}.json"));
    let table_error = |message: String| IngestionError::TableRead {
        table,
        path: path.clone(),
        message,
    };

    let file = File::open(&path).map_err(|e| table_error(e.to_string()))?;
    let rows: Vec<T> =
        serde_json::from_reader(BufReader::new(file)).map_err(|e| table_error(e.to_string()))?;
    debug!(table, rows = rows.len(), "table read");
    Ok(rows)
}

fn lookup<'a, T>(
    map: &'a HashMap<String, T>,
    table: &'static str,
    token: &str,
) -> std::result::Result<&'a T, ContractError> {
    map.get(token)
        .ok_or_else(|| ContractError::missing(table, token))
}

impl DatasetReader for NuScenesDataset {
    fn version(&self) -> &str {
        &self.version
    }

    fn scenes(&self) -> &[Scene] {
        &self.scenes
    }

    fn sample(&self, token: &str) -> std::result::Result<&Sample, ContractError> {
        lookup(&self.samples, "sample", token)
    }

    fn sample_data(&self, token: &str) -> std::result::Result<&SampleData, ContractError> {
        lookup(&self.sample_data, "sample_data", token)
    }

    fn ego_pose(&self, token: &str) -> std::result::Result<&EgoPose, ContractError> {
        lookup(&self.ego_poses, "ego_pose", token)
    }

    fn calibrated_sensor(
        &self,
        token: &str,
    ) -> std::result::Result<&CalibratedSensor, ContractError> {
        lookup(&self.calibrated_sensors, "calibrated_sensor", token)
    }

    fn log(&self, token: &str) -> std::result::Result<&Log, ContractError> {
        lookup(&self.logs, "log", token)
    }

    fn sample_annotation(
        &self,
        token: &str,
    ) -> std::result::Result<&SampleAnnotation, ContractError> {
        lookup(&self.annotations, "sample_annotation", token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::ErrorClass;
    use serde_json::json;
    use std::fs;

    fn write(dir: &Path, table: &str, value: serde_json::Value) {
        fs::write(dir.join(format!("{table}.json")), value.to_string()).unwrap();
    }

    fn fixture() -> tempfile::TempDir {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("v1.0-mini");
        fs::create_dir_all(&dir).unwrap();

        write(&dir, "scene", json!([{
            "token": "sc0", "log_token": "log0", "nbr_samples": 2,
            "first_sample_token": "s0", "last_sample_token": "s1",
            "name": "scene-0001", "description": "night, rain"
        }]));
        write(&dir, "sample", json!([
            {"token": "s0", "timestamp": 1000, "prev": "", "next": "s1", "scene_token": "sc0"},
            {"token": "s1", "timestamp": 2000, "prev": "s0", "next": "", "scene_token": "sc0"}
        ]));
        write(&dir, "sample_data", json!([
            {"token": "sd0", "sample_token": "s0", "ego_pose_token": "ep0",
             "calibrated_sensor_token": "cs0", "timestamp": 1000, "fileformat": "pcd",
             "is_key_frame": true, "height": 0, "width": 0,
             "filename": "samples/LIDAR_TOP/a.pcd.bin", "prev": "", "next": "sd1"},
            {"token": "sd1", "sample_token": "s0", "ego_pose_token": "ep1",
             "calibrated_sensor_token": "cs0", "timestamp": 1500, "fileformat": "pcd",
             "is_key_frame": false, "height": 0, "width": 0,
             "filename": "sweeps/LIDAR_TOP/b.pcd.bin", "prev": "sd0", "next": "sd2"},
            {"token": "sd2", "sample_token": "s1", "ego_pose_token": "ep2",
             "calibrated_sensor_token": "cs0", "timestamp": 2000, "fileformat": "pcd",
             "is_key_frame": true, "height": 0, "width": 0,
             "filename": "samples/LIDAR_TOP/c.pcd.bin", "prev": "sd1", "next": ""},
            {"token": "orphan", "sample_token": "s1", "ego_pose_token": "ep2",
             "calibrated_sensor_token": "nope", "timestamp": 2000, "fileformat": "pcd",
             "is_key_frame": true, "height": 0, "width": 0,
             "filename": "x", "prev": "", "next": ""}
        ]));
        write(&dir, "ego_pose", json!([
            {"token": "ep0", "timestamp": 1000, "rotation": [1.0, 0.0, 0.0, 0.0], "translation": [1.0, 2.0, 0.0]},
            {"token": "ep1", "timestamp": 1500, "rotation": [1.0, 0.0, 0.0, 0.0], "translation": [1.5, 2.0, 0.0]},
            {"token": "ep2", "timestamp": 2000, "rotation": [1.0, 0.0, 0.0, 0.0], "translation": [2.0, 2.0, 0.0]}
        ]));
        write(&dir, "calibrated_sensor", json!([
            {"token": "cs0", "sensor_token": "sen0", "translation": [0.9, 0.0, 1.8],
             "rotation": [0.7, 0.0, 0.0, 0.7], "camera_intrinsic": []}
        ]));
        write(&dir, "sensor", json!([
            {"token": "sen0", "channel": "LIDAR_TOP", "modality": "lidar"}
        ]));
        write(&dir, "log", json!([
            {"token": "log0", "logfile": "n015", "vehicle": "n015",
             "date_captured": "2018-07-24", "location": "singapore-onenorth"}
        ]));
        write(&dir, "sample_annotation", json!([
            {"token": "a0", "sample_token": "s0", "instance_token": "i0",
             "visibility_token": "4", "attribute_tokens": [],
             "translation": [10.0, 2.0, 1.0], "size": [1.9, 4.5, 1.6],
             "rotation": [1.0, 0.0, 0.0, 0.0], "prev": "", "next": "",
             "num_lidar_pts": 12, "num_radar_pts": 1}
        ]));
        write(&dir, "instance", json!([
            {"token": "i0", "category_token": "c0", "nbr_annotations": 1,
             "first_annotation_token": "a0", "last_annotation_token": "a0"}
        ]));
        write(&dir, "category", json!([
            {"token": "c0", "name": "vehicle.car", "description": ""}
        ]));
        root
    }

    #[test]
    fn test_open_resolves_derived_fields() {
        let root = fixture();
        let ds = NuScenesDataset::open(root.path(), "v1.0-mini").unwrap();

        assert_eq!(ds.version(), "v1.0-mini");
        let scene = ds.scene_by_name("scene-0001").unwrap();
        let samples = ds.scene_samples(scene).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].data.get("LIDAR_TOP").map(String::as_str), Some("sd0"));
        assert_eq!(samples[0].anns, vec!["a0".to_string()]);

        let sd = ds.sample_data("sd1").unwrap();
        assert_eq!(sd.channel, "LIDAR_TOP");
        assert_eq!(sd.modality, SensorModality::Lidar);
        assert_eq!(sd.prev.as_deref(), Some("sd0"));
        assert!(!sd.is_key_frame);

        assert_eq!(ds.sample_annotation("a0").unwrap().category_name, "vehicle.car");
        assert_eq!(ds.log(&scene.log_token).unwrap().location, "singapore-onenorth");
        assert!(ds.calibrated_sensor("cs0").unwrap().camera_intrinsic.is_none());
    }

    #[test]
    fn test_unresolved_sensor_is_missing() {
        let root = fixture();
        let ds = NuScenesDataset::open(root.path(), "v1.0-mini").unwrap();
        let err = ds.sample_data("orphan").unwrap_err();
        assert_eq!(err.class(), ErrorClass::DatasetIntegrity);
    }

    #[test]
    fn test_unknown_version_is_configuration_error() {
        let root = fixture();
        let err = NuScenesDataset::open(root.path(), "v1.0-trainval")
            .err()
            .unwrap();
        assert_eq!(err.class(), ErrorClass::Configuration);
    }

    #[test]
    fn test_corrupt_table_is_configuration_error() {
        let root = fixture();
        fs::write(root.path().join("v1.0-mini/sample.json"), "{not json").unwrap();
        let err = NuScenesDataset::open(root.path(), "v1.0-mini").err().unwrap();
        assert_eq!(err.class(), ErrorClass::Configuration);
        assert!(err.to_string().contains("sample"));
    }
}
