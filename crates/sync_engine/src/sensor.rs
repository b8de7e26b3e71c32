//! Sensor record -> events
//!
//! Dispatch is by modality: lidar and radar become one `PointCloud2` on
//! `/<CHANNEL>`; a camera becomes the compressed image, its `CameraInfo` and,
//! when a lidar record is given, the projected lidar overlay.

use contracts::{
    CalibratedSensor, ContractError, DatasetReader, Event, PayloadSource, SampleData,
    SensorModality, SensorPayload, Topic,
};
use messages::geometry_msgs::Point;
use messages::sensor_msgs::{CameraInfo, CompressedImage, PointCloud2};
use messages::std_msgs::{ColorRGBA, Header};
use messages::visualization_msgs::{ImageMarker, ImageMarkerArray};
use messages::{to_event, topics};
use tracing::{trace, warn};

use crate::geometry::{camera_from_lidar, isometry, ImagePoint, Pinhole};

/// Lidar points closer than this to the camera are not drawn
const MIN_OVERLAY_DEPTH: f64 = 1.0;

/// Depth mapped to the far end of the overlay palette
const MAX_OVERLAY_DEPTH: f64 = 50.0;

/// Builds the events of one sensor record
///
/// Payload problems are record-local: the record's events are dropped, the
/// failure is counted and conversion continues. Missing dataset records are
/// returned as errors.
pub struct SensorEvents<'a> {
    dataset: &'a dyn DatasetReader,
    payloads: &'a dyn PayloadSource,
    decode_failures: u64,
}

impl<'a> SensorEvents<'a> {
    pub fn new(dataset: &'a dyn DatasetReader, payloads: &'a dyn PayloadSource) -> Self {
        Self {
            dataset,
            payloads,
            decode_failures: 0,
        }
    }

    /// Records skipped so far
    pub fn decode_failures(&self) -> u64 {
        self.decode_failures
    }

    /// Events of `record`, all stamped `stamp_ns`
    pub fn record_events(
        &mut self,
        record: &SampleData,
        stamp_ns: u64,
        overlay_lidar: Option<&SampleData>,
    ) -> Result<Vec<Event>, ContractError> {
        match self.try_record_events(record, stamp_ns, overlay_lidar) {
            Ok(events) => Ok(events),
            Err(e) if e.is_record_local() => {
                self.skip(&record.channel, &record.token, &e);
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    fn skip(&mut self, channel: &str, token: &str, error: &ContractError) {
        self.decode_failures += 1;
        warn!(channel, token, error = %error, "record skipped");
        observability::record_decode_failure(channel);
    }

    fn try_record_events(
        &mut self,
        record: &SampleData,
        stamp_ns: u64,
        overlay_lidar: Option<&SampleData>,
    ) -> Result<Vec<Event>, ContractError> {
        let dataset = self.dataset;
        let payload = self.payloads.load(record)?;
        let topic = Topic::for_channel(&record.channel);
        let header = Header::new(stamp_ns, record.channel.as_str());

        match (record.modality, payload) {
            (SensorModality::Lidar | SensorModality::Radar, SensorPayload::PointCloud(cloud)) => {
                trace!(channel = %record.channel, points = cloud.num_points, "point cloud");
                let msg = PointCloud2::from_cloud(header, &cloud);
                Ok(vec![to_event(stamp_ns, &topic, &msg)?])
            }
            (SensorModality::Camera, SensorPayload::CompressedImage(image)) => {
                let calibration = dataset.calibrated_sensor(&record.calibrated_sensor_token)?;
                let intrinsic = calibration.camera_intrinsic.ok_or_else(|| {
                    ContractError::malformed_link(
                        "calibrated_sensor",
                        &calibration.token,
                        format!("camera '{}' has no intrinsic", record.channel),
                    )
                })?;

                let image_msg = CompressedImage {
                    header: header.clone(),
                    format: image.format,
                    data: image.data.to_vec(),
                };
                let info_msg = CameraInfo::pinhole(header, record.width, record.height, &intrinsic);
                let mut events = vec![
                    to_event(stamp_ns, &topic.child(topics::IMAGE_RECT_COMPRESSED), &image_msg)?,
                    to_event(stamp_ns, &topic.child(topics::CAMERA_INFO), &info_msg)?,
                ];

                if let Some(lidar) = overlay_lidar {
                    match self.lidar_overlay(record, calibration, &intrinsic, lidar, stamp_ns) {
                        Ok(event) => events.push(event),
                        // the image stays; only the overlay is dropped
                        Err(e) if e.is_record_local() => {
                            self.skip(&lidar.channel, &lidar.token, &e)
                        }
                        Err(e) => return Err(e),
                    }
                }
                Ok(events)
            }
            (modality, _) => Err(ContractError::payload_decode(
                &record.channel,
                &record.filename,
                format!("payload does not match modality '{}'", modality.as_str()),
            )),
        }
    }

    /// Lidar points projected into the camera image
    fn lidar_overlay(
        &self,
        camera: &SampleData,
        camera_calibration: &CalibratedSensor,
        intrinsic: &[[f64; 3]; 3],
        lidar: &SampleData,
        stamp_ns: u64,
    ) -> Result<Event, ContractError> {
        let cloud = match self.payloads.load(lidar)? {
            SensorPayload::PointCloud(cloud) => cloud,
            SensorPayload::CompressedImage(_) => {
                return Err(ContractError::payload_decode(
                    &lidar.channel,
                    &lidar.filename,
                    "overlay source is not a point cloud",
                ))
            }
        };

        let lidar_calibration = self.dataset.calibrated_sensor(&lidar.calibrated_sensor_token)?;
        let ego_at_lidar = self.dataset.ego_pose_of(lidar)?;
        let ego_at_camera = self.dataset.ego_pose_of(camera)?;
        let transform = camera_from_lidar(
            &isometry(lidar_calibration.translation, lidar_calibration.rotation),
            &isometry(ego_at_lidar.translation, ego_at_lidar.rotation),
            &isometry(ego_at_camera.translation, ego_at_camera.rotation),
            &isometry(camera_calibration.translation, camera_calibration.rotation),
        );
        let projected = Pinhole::new(intrinsic, camera.width, camera.height).project_cloud(
            cloud.xyz(),
            &transform,
            MIN_OVERLAY_DEPTH,
        );
        trace!(
            camera = %camera.channel,
            lidar = %lidar.token,
            points = projected.len(),
            "lidar overlay"
        );

        let msg = ImageMarkerArray {
            markers: vec![points_marker(
                Header::new(stamp_ns, camera.channel.as_str()),
                &lidar.channel,
                &projected,
            )],
        };
        let topic = Topic::for_channel(&camera.channel).child(topics::IMAGE_MARKERS_LIDAR);
        to_event(stamp_ns, &topic, &msg)
    }
}

fn points_marker(header: Header, ns: &str, points: &[ImagePoint]) -> ImageMarker {
    ImageMarker {
        header,
        ns: ns.to_string(),
        id: 0,
        marker_type: ImageMarker::POINTS,
        action: ImageMarker::ADD,
        position: Point::default(),
        scale: 2.0,
        outline_color: ColorRGBA::default(),
        filled: 0,
        fill_color: ColorRGBA::default(),
        lifetime: Default::default(),
        points: points
            .iter()
            .map(|p| Point {
                x: p.u,
                y: p.v,
                z: 0.0,
            })
            .collect(),
        outline_colors: points.iter().map(|p| depth_color(p.depth)).collect(),
    }
}

/// Near points red, far points blue
pub(crate) fn depth_color(depth: f64) -> ColorRGBA {
    let t = ((depth - MIN_OVERLAY_DEPTH) / (MAX_OVERLAY_DEPTH - MIN_OVERLAY_DEPTH)).clamp(0.0, 1.0)
        as f32;
    ColorRGBA::rgba(1.0 - t, 1.0 - (2.0 * t - 1.0).abs(), t, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingestion::{MemoryDataset, MemoryPayloadSource};

    fn dataset() -> MemoryDataset {
        MemoryDataset::builder("v1.0-test")
            .scene("scene-0001", "boston-seaport", |s| {
                s.channel("LIDAR_TOP", SensorModality::Lidar)
                    .channel("CAM_FRONT", SensorModality::Camera)
                    .channel("RADAR_FRONT", SensorModality::Radar)
                    .keyframe(1_000_000)
            })
            .build()
    }

    fn record<'d>(ds: &'d MemoryDataset, channel: &str) -> &'d SampleData {
        let token = ds.channel_tokens("scene-0001", channel)[0].clone();
        ds.sample_data(&token).unwrap()
    }

    #[test]
    fn test_point_cloud_topics() {
        let ds = dataset();
        let payloads = MemoryPayloadSource::new();
        let mut events = SensorEvents::new(&ds, &payloads);

        let lidar = events.record_events(record(&ds, "LIDAR_TOP"), 7, None).unwrap();
        assert_eq!(lidar.len(), 1);
        assert_eq!(lidar[0].topic, "/LIDAR_TOP");
        assert_eq!(lidar[0].timestamp_ns, 7);

        let radar = events.record_events(record(&ds, "RADAR_FRONT"), 7, None).unwrap();
        assert_eq!(radar[0].topic, "/RADAR_FRONT");
        assert_eq!(radar[0].schema.name, "sensor_msgs/msg/PointCloud2");
    }

    #[test]
    fn test_camera_events_with_overlay() {
        let ds = dataset();
        let payloads = MemoryPayloadSource::new();
        let mut events = SensorEvents::new(&ds, &payloads);
        let lidar = record(&ds, "LIDAR_TOP");

        let cam = events
            .record_events(record(&ds, "CAM_FRONT"), 9, Some(lidar))
            .unwrap();
        let topics: Vec<&str> = cam.iter().map(|e| e.topic.as_str()).collect();
        assert_eq!(
            topics,
            vec![
                "/CAM_FRONT/image_rect_compressed",
                "/CAM_FRONT/camera_info",
                "/CAM_FRONT/image_markers_lidar"
            ]
        );
        assert!(cam.iter().all(|e| e.timestamp_ns == 9));

        let without = events.record_events(record(&ds, "CAM_FRONT"), 9, None).unwrap();
        assert_eq!(without.len(), 2);
    }

    #[test]
    fn test_decode_failure_is_counted() {
        let ds = dataset();
        let cam = record(&ds, "CAM_FRONT");
        let payloads = MemoryPayloadSource::new().fail_on(&cam.token);
        let mut events = SensorEvents::new(&ds, &payloads);

        assert!(events.record_events(cam, 1, None).unwrap().is_empty());
        assert_eq!(events.decode_failures(), 1);
    }

    #[test]
    fn test_failed_overlay_keeps_image() {
        let ds = dataset();
        let lidar = record(&ds, "LIDAR_TOP");
        let payloads = MemoryPayloadSource::new().fail_on(&lidar.token);
        let mut events = SensorEvents::new(&ds, &payloads);

        let cam = events
            .record_events(record(&ds, "CAM_FRONT"), 1, Some(lidar))
            .unwrap();
        assert_eq!(cam.len(), 2);
        assert_eq!(events.decode_failures(), 1);
    }

    #[test]
    fn test_missing_calibration_is_fatal() {
        let ds = dataset();
        let mut cam = record(&ds, "CAM_FRONT").clone();
        cam.calibrated_sensor_token = "nope".into();
        let payloads = MemoryPayloadSource::new();
        let mut events = SensorEvents::new(&ds, &payloads);
        assert!(events.record_events(&cam, 1, None).is_err());
    }

    #[test]
    fn test_depth_palette_ends() {
        let near = depth_color(1.0);
        let far = depth_color(80.0);
        assert_eq!((near.r, near.b), (1.0, 0.0));
        assert_eq!((far.r, far.b), (0.0, 1.0));
    }
}
