//! 传感器适配器模块
//!
//! 每种模态一个解码器；[`FilePayloadSource`] 读取记录对应的文件，
//! 按 [`SensorModality`] 分派。

pub mod camera;
pub mod lidar;
pub mod radar;

use std::path::{Path, PathBuf};

use bytes::Bytes;
use contracts::{ContractError, PayloadSource, SampleData, SensorModality, SensorPayload};
use metrics::counter;
use tracing::trace;

/// Decode raw file bytes by modality
pub fn decode(modality: SensorModality, raw: Bytes) -> crate::Result<SensorPayload> {
    match modality {
        SensorModality::Lidar => lidar::decode(raw),
        SensorModality::Radar => radar::decode(raw),
        SensorModality::Camera => camera::decode(raw),
    }
}

/// Payload source reading files relative to the dataset root
#[derive(Debug, Clone)]
pub struct FilePayloadSource {
    root: PathBuf,
}

impl FilePayloadSource {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }
}

impl PayloadSource for FilePayloadSource {
    fn load(&self, record: &SampleData) -> Result<SensorPayload, ContractError> {
        let path = self.root.join(&record.filename);
        let raw = std::fs::read(&path).map_err(|e| {
            ContractError::payload_decode(&record.channel, &record.filename, e.to_string())
        })?;

        trace!(channel = %record.channel, bytes = raw.len(), "payload read");
        counter!("nuscenes2mcap_payload_bytes_total", "modality" => record.modality.as_str())
            .increment(raw.len() as u64);

        decode(record.modality, Bytes::from(raw))
            .map_err(|e| e.into_decode(&record.channel, &record.filename))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::ErrorClass;

    fn record(filename: &str, modality: SensorModality) -> SampleData {
        SampleData {
            token: "sd".into(),
            sample_token: "s".into(),
            ego_pose_token: "ep".into(),
            calibrated_sensor_token: "cs".into(),
            timestamp: 0,
            fileformat: "jpg".into(),
            is_key_frame: true,
            height: 900,
            width: 1600,
            filename: filename.into(),
            prev: None,
            next: None,
            channel: "CAM_FRONT".into(),
            modality,
        }
    }

    #[test]
    fn test_file_source_dispatches_by_modality() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("samples/CAM_FRONT")).unwrap();
        std::fs::write(root.path().join("samples/CAM_FRONT/a.jpg"), [0xFF, 0xD8, 0x00]).unwrap();

        let source = FilePayloadSource::new(root.path());
        let payload = source
            .load(&record("samples/CAM_FRONT/a.jpg", SensorModality::Camera))
            .unwrap();
        assert!(matches!(payload, SensorPayload::CompressedImage(_)));

        // Same bytes are not a valid lidar sweep.
        let err = source
            .load(&record("samples/CAM_FRONT/a.jpg", SensorModality::Lidar))
            .unwrap_err();
        assert_eq!(err.class(), ErrorClass::PayloadDecode);
    }

    #[test]
    fn test_missing_file_is_record_local() {
        let root = tempfile::tempdir().unwrap();
        let err = FilePayloadSource::new(root.path())
            .load(&record("samples/CAM_FRONT/missing.jpg", SensorModality::Camera))
            .unwrap_err();
        assert!(err.is_record_local());
        assert!(err.to_string().contains("missing.jpg"));
    }
}
