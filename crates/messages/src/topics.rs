//! Output topic names

pub const TF: &str = "/tf";
pub const POSE: &str = "/pose";
pub const GPS: &str = "/gps";
pub const MAP: &str = "/map";
pub const SEMANTIC_MAP: &str = "/semantic_map";
pub const DRIVABLE_AREA: &str = "/drivable_area";
pub const ANNOTATIONS: &str = "/markers/annotations";
pub const IMU: &str = "/imu";
pub const ODOM: &str = "/odom";
pub const DIAGNOSTICS: &str = "/diagnostics";

/// Camera leaf topics under `/<CHANNEL>`
pub const IMAGE_RECT_COMPRESSED: &str = "image_rect_compressed";
pub const CAMERA_INFO: &str = "camera_info";
pub const IMAGE_MARKERS_LIDAR: &str = "image_markers_lidar";

/// Frame ids
pub const MAP_FRAME: &str = "map";
pub const BASE_FRAME: &str = "base_link";
pub const ODOM_FRAME: &str = "odom";
