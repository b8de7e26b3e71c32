//! Keyframe-anchored events: transforms, pose, gps, annotations and map
//! layers. All of them carry the keyframe timestamp.

use contracts::{Bounds2, ContractError, DatasetReader, EgoPose, Event, Sample, SceneMap, Topic};
use messages::geometry_msgs::{Point, Pose, PoseStamped, Transform, TransformStamped, Vector3};
use messages::nav_msgs::OccupancyGrid;
use messages::sensor_msgs::{NavSatFix, NavSatStatus};
use messages::std_msgs::{ColorRGBA, Header, Time};
use messages::tf2_msgs::TFMessage;
use messages::visualization_msgs::{Marker, MarkerArray};
use messages::{to_event, topics};
use tracing::warn;

use crate::gps;

/// Annotation colour by category prefix (first match wins)
const CATEGORY_COLORS: [(&str, [u8; 3]); 5] = [
    ("vehicle", [255, 158, 0]),
    ("human", [0, 0, 230]),
    ("movable_object", [112, 128, 144]),
    ("static_object", [188, 143, 143]),
    ("animal", [70, 130, 180]),
];

const UNKNOWN_CATEGORY_COLOR: [u8; 3] = [255, 0, 255];

/// Annotation boxes are replaced at the next keyframe (2 Hz)
const ANNOTATION_LIFETIME: Time = Time {
    sec: 0,
    nanosec: 500_000_000,
};

/// `/tf`: `map -> base_link` plus `base_link -> <CHANNEL>` per keyframe channel
pub fn transforms(
    dataset: &dyn DatasetReader,
    sample: &Sample,
    ego: &EgoPose,
    stamp_ns: u64,
) -> Result<Event, ContractError> {
    let mut msg = TFMessage {
        transforms: Vec::with_capacity(sample.data.len() + 1),
    };
    msg.transforms.push(TransformStamped {
        header: Header::new(stamp_ns, topics::MAP_FRAME),
        child_frame_id: topics::BASE_FRAME.to_string(),
        transform: Transform::new(ego.translation, ego.rotation),
    });
    for (channel, token) in &sample.data {
        let record = dataset.sample_data(token)?;
        let calibration = dataset.calibrated_sensor(&record.calibrated_sensor_token)?;
        msg.transforms.push(TransformStamped {
            header: Header::new(stamp_ns, topics::BASE_FRAME),
            child_frame_id: channel.clone(),
            transform: Transform::new(calibration.translation, calibration.rotation),
        });
    }
    to_event(stamp_ns, &Topic::new(topics::TF), &msg)
}

/// `/pose`: the vehicle origin in its own frame
pub fn pose(stamp_ns: u64) -> Result<Event, ContractError> {
    let msg = PoseStamped {
        header: Header::new(stamp_ns, topics::BASE_FRAME),
        pose: Pose::identity(),
    };
    to_event(stamp_ns, &Topic::new(topics::POSE), &msg)
}

/// `/gps`; `None` for a location without a reference coordinate
pub fn gps_fix(
    location: &str,
    ego: &EgoPose,
    stamp_ns: u64,
) -> Result<Option<Event>, ContractError> {
    let Some((latitude, longitude)) =
        gps::to_lat_lon(location, ego.translation[0], ego.translation[1])
    else {
        warn!(location, "no reference coordinate, gps skipped");
        return Ok(None);
    };
    let msg = NavSatFix {
        header: Header::new(stamp_ns, topics::BASE_FRAME),
        status: NavSatStatus {
            status: NavSatStatus::STATUS_FIX,
            service: NavSatStatus::SERVICE_GPS,
        },
        latitude,
        longitude,
        altitude: 0.0,
        position_covariance: [0.0; 9],
        position_covariance_type: NavSatFix::COVARIANCE_TYPE_UNKNOWN,
    };
    to_event(stamp_ns, &Topic::new(topics::GPS), &msg).map(Some)
}

fn category_color(category: &str) -> ColorRGBA {
    let rgb = CATEGORY_COLORS
        .iter()
        .find(|(prefix, _)| category.starts_with(prefix))
        .map_or(UNKNOWN_CATEGORY_COLOR, |(_, rgb)| *rgb);
    ColorRGBA {
        a: 0.5,
        ..ColorRGBA::from_rgb8(rgb)
    }
}

/// `/markers/annotations`: one cube per box of the keyframe
pub fn annotations(
    dataset: &dyn DatasetReader,
    sample: &Sample,
    stamp_ns: u64,
) -> Result<Event, ContractError> {
    let mut msg = MarkerArray::default();
    for (id, token) in sample.anns.iter().enumerate() {
        let ann = dataset.sample_annotation(token)?;
        let mut marker = Marker::new(
            Header::new(stamp_ns, topics::MAP_FRAME),
            &ann.category_name,
            id as i32,
            Marker::CUBE,
        );
        marker.pose = Pose::new(ann.translation, ann.rotation);
        // size is (width, length, height); the box x axis runs along its length
        marker.scale = Vector3 {
            x: ann.size[1],
            y: ann.size[0],
            z: ann.size[2],
        };
        marker.color = category_color(&ann.category_name);
        marker.lifetime = ANNOTATION_LIFETIME;
        msg.markers.push(marker);
    }
    to_event(stamp_ns, &Topic::new(topics::ANNOTATIONS), &msg)
}

/// `/map`: occupancy raster around the scene
pub fn scene_map(
    map: &dyn SceneMap,
    bounds: &Bounds2,
    stamp_ns: u64,
) -> Result<Event, ContractError> {
    let grid = map.scene_grid(bounds);
    let msg = OccupancyGrid::from_grid(Header::new(stamp_ns, topics::MAP_FRAME), &grid);
    to_event(stamp_ns, &Topic::new(topics::MAP), &msg)
}

/// `/semantic_map`: lane outlines as line strips
pub fn semantic_map(
    map: &dyn SceneMap,
    bounds: &Bounds2,
    stamp_ns: u64,
) -> Result<Event, ContractError> {
    let markers = map
        .semantic_lines(bounds)
        .into_iter()
        .enumerate()
        .map(|(id, line)| {
            let mut marker = Marker::new(
                Header::new(stamp_ns, topics::MAP_FRAME),
                "lane",
                id as i32,
                Marker::LINE_STRIP,
            );
            marker.scale.x = 0.1;
            marker.color = ColorRGBA::rgba(1.0, 1.0, 1.0, 1.0);
            marker.frame_locked = true;
            marker.points = line.into_iter().map(Point::from).collect();
            marker
        })
        .collect();
    to_event(
        stamp_ns,
        &Topic::new(topics::SEMANTIC_MAP),
        &MarkerArray { markers },
    )
}

/// `/drivable_area` around the ego position; `None` off the map
pub fn drivable_area(
    map: &dyn SceneMap,
    ego: &EgoPose,
    stamp_ns: u64,
) -> Result<Option<Event>, ContractError> {
    let Some(grid) = map.drivable_area([ego.translation[0], ego.translation[1]]) else {
        return Ok(None);
    };
    let msg = OccupancyGrid::from_grid(Header::new(stamp_ns, topics::MAP_FRAME), &grid);
    to_event(stamp_ns, &Topic::new(topics::DRIVABLE_AREA), &msg).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::SensorModality;
    use ingestion::{BlankMap, MemoryDataset};

    fn dataset() -> MemoryDataset {
        MemoryDataset::builder("v1.0-test")
            .scene("scene-0001", "boston-seaport", |s| {
                s.channel("LIDAR_TOP", SensorModality::Lidar)
                    .channel("CAM_FRONT", SensorModality::Camera)
                    .keyframe(2_000_000)
                    .annotation("vehicle.car", [620.0, 1600.0, 1.0])
                    .annotation("human.pedestrian.adult", [630.0, 1601.0, 1.0])
            })
            .build()
    }

    fn first_sample(ds: &MemoryDataset) -> &Sample {
        let scene = ds.scene_by_name("scene-0001").unwrap();
        ds.sample(&scene.first_sample_token).unwrap()
    }

    fn ego() -> EgoPose {
        EgoPose {
            token: "ego".into(),
            timestamp: 2_000_000,
            translation: [600.0, 1600.0, 0.0],
            rotation: [1.0, 0.0, 0.0, 0.0],
        }
    }

    #[test]
    fn test_keyframe_events_share_the_stamp() {
        let ds = dataset();
        let sample = first_sample(&ds);
        let stamp = 2_000_000_000;
        let events = [
            transforms(&ds, sample, &ego(), stamp).unwrap(),
            pose(stamp).unwrap(),
            gps_fix("boston-seaport", &ego(), stamp).unwrap().unwrap(),
            annotations(&ds, sample, stamp).unwrap(),
        ];
        let topics: Vec<&str> = events.iter().map(|e| e.topic.as_str()).collect();
        assert_eq!(topics, vec!["/tf", "/pose", "/gps", "/markers/annotations"]);
        assert!(events.iter().all(|e| e.timestamp_ns == stamp));
    }

    #[test]
    fn test_unknown_location_skips_gps() {
        assert!(gps_fix("atlantis", &ego(), 1).unwrap().is_none());
    }

    #[test]
    fn test_missing_annotation_is_fatal() {
        let mut ds = dataset();
        let token = first_sample(&ds).token.clone();
        ds.sample_mut(&token).unwrap().anns.push("missing".into());
        let sample = first_sample(&ds);
        assert!(annotations(&ds, sample, 1).is_err());
    }

    #[test]
    fn test_category_colors() {
        assert_eq!(category_color("vehicle.car").r, 1.0);
        assert_eq!(category_color("human.pedestrian.adult").b, 230.0 / 255.0);
        assert_eq!(category_color("flat.driveable_surface").g, 0.0);
        assert_eq!(category_color("vehicle.truck").a, 0.5);
    }

    #[test]
    fn test_blank_map_layers() {
        let map = BlankMap;
        let bounds = Bounds2 {
            min: [0.0, 0.0],
            max: [10.0, 10.0],
        };
        assert_eq!(scene_map(&map, &bounds, 5).unwrap().topic, "/map");
        assert_eq!(semantic_map(&map, &bounds, 5).unwrap().topic, "/semantic_map");
        assert!(drivable_area(&map, &ego(), 5).unwrap().is_none());
    }
}
