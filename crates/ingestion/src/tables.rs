//! On-disk nuScenes table rows
//!
//! Field names follow the JSON files. Links are empty strings when absent.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct SceneRow {
    pub token: String,
    pub log_token: String,
    pub nbr_samples: u32,
    pub first_sample_token: String,
    pub last_sample_token: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SampleRow {
    pub token: String,
    pub timestamp: u64,
    pub prev: String,
    pub next: String,
    pub scene_token: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SampleDataRow {
    pub token: String,
    pub sample_token: String,
    pub ego_pose_token: String,
    pub calibrated_sensor_token: String,
    pub timestamp: u64,
    pub fileformat: String,
    pub is_key_frame: bool,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub width: u32,
    pub filename: String,
    pub prev: String,
    pub next: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EgoPoseRow {
    pub token: String,
    pub timestamp: u64,
    pub rotation: [f64; 4],
    pub translation: [f64; 3],
}

#[derive(Debug, Deserialize)]
pub(crate) struct CalibratedSensorRow {
    pub token: String,
    pub sensor_token: String,
    pub translation: [f64; 3],
    pub rotation: [f64; 4],
    #[serde(default)]
    pub camera_intrinsic: Vec<Vec<f64>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SensorRow {
    pub token: String,
    pub channel: String,
    pub modality: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LogRow {
    pub token: String,
    #[serde(default)]
    pub logfile: String,
    #[serde(default)]
    pub vehicle: String,
    #[serde(default)]
    pub date_captured: String,
    pub location: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SampleAnnotationRow {
    pub token: String,
    pub sample_token: String,
    pub instance_token: String,
    pub translation: [f64; 3],
    pub size: [f64; 3],
    pub rotation: [f64; 4],
    #[serde(default)]
    pub num_lidar_pts: u32,
    #[serde(default)]
    pub num_radar_pts: u32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct InstanceRow {
    pub token: String,
    pub category_token: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CategoryRow {
    pub token: String,
    pub name: String,
}

/// `""` -> `None`
pub(crate) fn link(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Row-major 3x3 intrinsic; anything else (radar/lidar `[]`) is `None`
pub(crate) fn intrinsic(rows: &[Vec<f64>]) -> Option<[[f64; 3]; 3]> {
    if rows.len() != 3 || rows.iter().any(|row| row.len() != 3) {
        return None;
    }
    let mut matrix = [[0.0; 3]; 3];
    for (r, row) in rows.iter().enumerate() {
        matrix[r].copy_from_slice(row);
    }
    Some(matrix)
}
