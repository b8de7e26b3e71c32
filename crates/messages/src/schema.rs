//! ROS 2 message definitions (`ros2msg` encoding)
//!
//! Each schema is the top-level definition followed by every nested type,
//! separated the way `ros2 bag` writes them.

use contracts::MessageSchema;

macro_rules! msg {
    ($name:literal) => {
        concat!(
            "================================================================================\nMSG: ",
            $name,
            "\n"
        )
    };
}

macro_rules! time_def {
    () => {
        "int32 sec\nuint32 nanosec\n"
    };
}

macro_rules! header_def {
    () => {
        concat!(
            msg!("std_msgs/Header"),
            "builtin_interfaces/Time stamp\nstring frame_id\n",
            msg!("builtin_interfaces/Time"),
            time_def!()
        )
    };
}

macro_rules! xyz_def {
    () => {
        "float64 x\nfloat64 y\nfloat64 z\n"
    };
}

macro_rules! quaternion_def {
    () => {
        concat!(
            msg!("geometry_msgs/Quaternion"),
            "float64 x\nfloat64 y\nfloat64 z\nfloat64 w\n"
        )
    };
}

macro_rules! pose_def {
    () => {
        concat!(
            msg!("geometry_msgs/Pose"),
            "geometry_msgs/Point position\ngeometry_msgs/Quaternion orientation\n",
            msg!("geometry_msgs/Point"),
            xyz_def!(),
            quaternion_def!()
        )
    };
}

macro_rules! color_def {
    () => {
        concat!(
            msg!("std_msgs/ColorRGBA"),
            "float32 r\nfloat32 g\nfloat32 b\nfloat32 a\n"
        )
    };
}

pub static POINT_CLOUD2: MessageSchema = MessageSchema {
    name: "sensor_msgs/msg/PointCloud2",
    definition: concat!(
        "std_msgs/Header header\nuint32 height\nuint32 width\nsensor_msgs/PointField[] fields\n",
        "bool is_bigendian\nuint32 point_step\nuint32 row_step\nuint8[] data\nbool is_dense\n",
        header_def!(),
        msg!("sensor_msgs/PointField"),
        "uint8 INT8=1\nuint8 UINT8=2\nuint8 INT16=3\nuint8 UINT16=4\nuint8 INT32=5\n",
        "uint8 UINT32=6\nuint8 FLOAT32=7\nuint8 FLOAT64=8\n",
        "string name\nuint32 offset\nuint8 datatype\nuint32 count\n"
    ),
};

pub static COMPRESSED_IMAGE: MessageSchema = MessageSchema {
    name: "sensor_msgs/msg/CompressedImage",
    definition: concat!(
        "std_msgs/Header header\nstring format\nuint8[] data\n",
        header_def!()
    ),
};

pub static CAMERA_INFO: MessageSchema = MessageSchema {
    name: "sensor_msgs/msg/CameraInfo",
    definition: concat!(
        "std_msgs/Header header\nuint32 height\nuint32 width\nstring distortion_model\n",
        "float64[] d\nfloat64[9] k\nfloat64[9] r\nfloat64[12] p\nuint32 binning_x\n",
        "uint32 binning_y\nsensor_msgs/RegionOfInterest roi\n",
        header_def!(),
        msg!("sensor_msgs/RegionOfInterest"),
        "uint32 x_offset\nuint32 y_offset\nuint32 height\nuint32 width\nbool do_rectify\n"
    ),
};

pub static IMU: MessageSchema = MessageSchema {
    name: "sensor_msgs/msg/Imu",
    definition: concat!(
        "std_msgs/Header header\ngeometry_msgs/Quaternion orientation\n",
        "float64[9] orientation_covariance\ngeometry_msgs/Vector3 angular_velocity\n",
        "float64[9] angular_velocity_covariance\ngeometry_msgs/Vector3 linear_acceleration\n",
        "float64[9] linear_acceleration_covariance\n",
        header_def!(),
        quaternion_def!(),
        msg!("geometry_msgs/Vector3"),
        xyz_def!()
    ),
};

pub static NAV_SAT_FIX: MessageSchema = MessageSchema {
    name: "sensor_msgs/msg/NavSatFix",
    definition: concat!(
        "uint8 COVARIANCE_TYPE_UNKNOWN=0\nuint8 COVARIANCE_TYPE_APPROXIMATED=1\n",
        "uint8 COVARIANCE_TYPE_DIAGONAL_KNOWN=2\nuint8 COVARIANCE_TYPE_KNOWN=3\n",
        "std_msgs/Header header\nsensor_msgs/NavSatStatus status\nfloat64 latitude\n",
        "float64 longitude\nfloat64 altitude\nfloat64[9] position_covariance\n",
        "uint8 position_covariance_type\n",
        header_def!(),
        msg!("sensor_msgs/NavSatStatus"),
        "int8 STATUS_NO_FIX=-1\nint8 STATUS_FIX=0\nint8 STATUS_SBAS_FIX=1\nint8 STATUS_GBAS_FIX=2\n",
        "int8 status\nuint16 SERVICE_GPS=1\nuint16 SERVICE_GLONASS=2\nuint16 SERVICE_COMPASS=4\n",
        "uint16 SERVICE_GALILEO=8\nuint16 service\n"
    ),
};

pub static ODOMETRY: MessageSchema = MessageSchema {
    name: "nav_msgs/msg/Odometry",
    definition: concat!(
        "std_msgs/Header header\nstring child_frame_id\n",
        "geometry_msgs/PoseWithCovariance pose\ngeometry_msgs/TwistWithCovariance twist\n",
        header_def!(),
        msg!("geometry_msgs/PoseWithCovariance"),
        "geometry_msgs/Pose pose\nfloat64[36] covariance\n",
        pose_def!(),
        msg!("geometry_msgs/TwistWithCovariance"),
        "geometry_msgs/Twist twist\nfloat64[36] covariance\n",
        msg!("geometry_msgs/Twist"),
        "geometry_msgs/Vector3 linear\ngeometry_msgs/Vector3 angular\n",
        msg!("geometry_msgs/Vector3"),
        xyz_def!()
    ),
};

pub static OCCUPANCY_GRID: MessageSchema = MessageSchema {
    name: "nav_msgs/msg/OccupancyGrid",
    definition: concat!(
        "std_msgs/Header header\nnav_msgs/MapMetaData info\nint8[] data\n",
        header_def!(),
        msg!("nav_msgs/MapMetaData"),
        "builtin_interfaces/Time map_load_time\nfloat32 resolution\nuint32 width\n",
        "uint32 height\ngeometry_msgs/Pose origin\n",
        pose_def!()
    ),
};

pub static POSE_STAMPED: MessageSchema = MessageSchema {
    name: "geometry_msgs/msg/PoseStamped",
    definition: concat!(
        "std_msgs/Header header\ngeometry_msgs/Pose pose\n",
        header_def!(),
        pose_def!()
    ),
};

pub static TF_MESSAGE: MessageSchema = MessageSchema {
    name: "tf2_msgs/msg/TFMessage",
    definition: concat!(
        "geometry_msgs/TransformStamped[] transforms\n",
        msg!("geometry_msgs/TransformStamped"),
        "std_msgs/Header header\nstring child_frame_id\ngeometry_msgs/Transform transform\n",
        header_def!(),
        msg!("geometry_msgs/Transform"),
        "geometry_msgs/Vector3 translation\ngeometry_msgs/Quaternion rotation\n",
        msg!("geometry_msgs/Vector3"),
        xyz_def!(),
        quaternion_def!()
    ),
};

pub static DIAGNOSTIC_ARRAY: MessageSchema = MessageSchema {
    name: "diagnostic_msgs/msg/DiagnosticArray",
    definition: concat!(
        "std_msgs/Header header\ndiagnostic_msgs/DiagnosticStatus[] status\n",
        header_def!(),
        msg!("diagnostic_msgs/DiagnosticStatus"),
        "byte OK=0\nbyte WARN=1\nbyte ERROR=2\nbyte STALE=3\nbyte level\nstring name\n",
        "string message\nstring hardware_id\ndiagnostic_msgs/KeyValue[] values\n",
        msg!("diagnostic_msgs/KeyValue"),
        "string key\nstring value\n"
    ),
};

pub static MARKER_ARRAY: MessageSchema = MessageSchema {
    name: "visualization_msgs/msg/MarkerArray",
    definition: concat!(
        "visualization_msgs/Marker[] markers\n",
        msg!("visualization_msgs/Marker"),
        "int32 ARROW=0\nint32 CUBE=1\nint32 SPHERE=2\nint32 CYLINDER=3\nint32 LINE_STRIP=4\n",
        "int32 LINE_LIST=5\nint32 CUBE_LIST=6\nint32 SPHERE_LIST=7\nint32 POINTS=8\n",
        "int32 TEXT_VIEW_FACING=9\nint32 MESH_RESOURCE=10\nint32 TRIANGLE_LIST=11\n",
        "int32 ADD=0\nint32 MODIFY=0\nint32 DELETE=2\nint32 DELETEALL=3\n",
        "std_msgs/Header header\nstring ns\nint32 id\nint32 type\nint32 action\n",
        "geometry_msgs/Pose pose\ngeometry_msgs/Vector3 scale\nstd_msgs/ColorRGBA color\n",
        "builtin_interfaces/Duration lifetime\nbool frame_locked\ngeometry_msgs/Point[] points\n",
        "std_msgs/ColorRGBA[] colors\nstring text\nstring mesh_resource\n",
        "bool mesh_use_embedded_materials\n",
        header_def!(),
        pose_def!(),
        msg!("geometry_msgs/Vector3"),
        xyz_def!(),
        color_def!(),
        msg!("builtin_interfaces/Duration"),
        time_def!()
    ),
};

pub static IMAGE_MARKER_ARRAY: MessageSchema = MessageSchema {
    name: "foxglove_msgs/msg/ImageMarkerArray",
    definition: concat!(
        "visualization_msgs/ImageMarker[] markers\n",
        msg!("visualization_msgs/ImageMarker"),
        "int32 CIRCLE=0\nint32 LINE_STRIP=1\nint32 LINE_LIST=2\nint32 POLYGON=3\n",
        "int32 POINTS=4\nint32 ADD=0\nint32 REMOVE=1\n",
        "std_msgs/Header header\nstring ns\nint32 id\nint32 type\nint32 action\n",
        "geometry_msgs/Point position\nfloat32 scale\nstd_msgs/ColorRGBA outline_color\n",
        "uint8 filled\nstd_msgs/ColorRGBA fill_color\nbuiltin_interfaces/Duration lifetime\n",
        "geometry_msgs/Point[] points\nstd_msgs/ColorRGBA[] outline_colors\n",
        header_def!(),
        msg!("geometry_msgs/Point"),
        xyz_def!(),
        color_def!(),
        msg!("builtin_interfaces/Duration"),
        time_def!()
    ),
};
