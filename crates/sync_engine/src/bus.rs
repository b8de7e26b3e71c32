//! CAN bus channel table and decoders

use contracts::{BusMessage, ContractError, Event, Timestamped, Topic};
use messages::diagnostic_msgs::{DiagnosticArray, DiagnosticStatus, KeyValue};
use messages::geometry_msgs::{
    Pose, PoseWithCovariance, Quaternion, Twist, TwistWithCovariance, Vector3,
};
use messages::nav_msgs::Odometry;
use messages::sensor_msgs::Imu;
use messages::std_msgs::Header;
use messages::{to_event, topics};

use crate::cursor::Decoder;

/// One bus signal group and where it goes
#[derive(Debug, Clone, Copy)]
pub struct BusChannel {
    /// Group name in `can_bus/<scene>_<group>.json`
    pub group: &'static str,
    pub decode: Decoder<BusMessage>,
    pub topic: &'static str,
}

/// The six merged bus groups
pub static BUS_CHANNELS: [BusChannel; 6] = [
    BusChannel {
        group: "ms_imu",
        decode: imu,
        topic: topics::IMU,
    },
    BusChannel {
        group: "pose",
        decode: odometry,
        topic: topics::ODOM,
    },
    BusChannel {
        group: "steeranglefeedback",
        decode: steering_angle,
        topic: topics::DIAGNOSTICS,
    },
    BusChannel {
        group: "vehicle_monitor",
        decode: vehicle_monitor,
        topic: topics::DIAGNOSTICS,
    },
    BusChannel {
        group: "zoesensors",
        decode: zoe_sensors,
        topic: topics::DIAGNOSTICS,
    },
    BusChannel {
        group: "zoe_veh_info",
        decode: zoe_vehicle_info,
        topic: topics::DIAGNOSTICS,
    },
];

fn signal<const N: usize>(
    message: &BusMessage,
    group: &str,
    name: &str,
) -> Result<[f64; N], ContractError> {
    message
        .signal(name)
        .and_then(|value| value.as_slice())
        .and_then(|values| <[f64; N]>::try_from(values).ok())
        .ok_or_else(|| {
            ContractError::payload_decode(
                group,
                format!("utime {}", message.utime),
                format!("signal '{name}' missing or not {N} values"),
            )
        })
}

fn imu(message: &BusMessage, topic: &Topic) -> Result<Event, ContractError> {
    let ts = message.timestamp_ns();
    let q = signal::<4>(message, "ms_imu", "q")?;
    let rotation_rate = signal::<3>(message, "ms_imu", "rotation_rate")?;
    let linear_accel = signal::<3>(message, "ms_imu", "linear_accel")?;

    let msg = Imu {
        header: Header::new(ts, topics::BASE_FRAME),
        orientation: Quaternion::from_wxyz(q),
        orientation_covariance: [0.0; 9],
        angular_velocity: Vector3::from(rotation_rate),
        angular_velocity_covariance: [0.0; 9],
        linear_acceleration: Vector3::from(linear_accel),
        linear_acceleration_covariance: [0.0; 9],
    };
    to_event(ts, topic, &msg)
}

fn odometry(message: &BusMessage, topic: &Topic) -> Result<Event, ContractError> {
    let ts = message.timestamp_ns();
    let pos = signal::<3>(message, "pose", "pos")?;
    let orientation = signal::<4>(message, "pose", "orientation")?;
    let vel = signal::<3>(message, "pose", "vel")?;
    let rotation_rate = signal::<3>(message, "pose", "rotation_rate")?;

    let msg = Odometry {
        header: Header::new(ts, topics::ODOM_FRAME),
        child_frame_id: topics::BASE_FRAME.to_string(),
        pose: PoseWithCovariance {
            pose: Pose::new(pos, orientation),
            covariance: [0.0; 36],
        },
        twist: TwistWithCovariance {
            twist: Twist {
                linear: Vector3::from(vel),
                angular: Vector3::from(rotation_rate),
            },
            covariance: [0.0; 36],
        },
    };
    to_event(ts, topic, &msg)
}

/// Every signal as a key/value pair of one status entry
fn diagnostics(name: &str, message: &BusMessage, topic: &Topic) -> Result<Event, ContractError> {
    let ts = message.timestamp_ns();
    let msg = DiagnosticArray {
        header: Header::new(ts, topics::BASE_FRAME),
        status: vec![DiagnosticStatus {
            level: DiagnosticStatus::OK,
            name: name.to_string(),
            message: String::new(),
            hardware_id: "can".to_string(),
            values: message
                .signals
                .iter()
                .map(|(key, value)| KeyValue {
                    key: key.clone(),
                    value: value.render(),
                })
                .collect(),
        }],
    };
    to_event(ts, topic, &msg)
}

fn steering_angle(message: &BusMessage, topic: &Topic) -> Result<Event, ContractError> {
    diagnostics("Steering Angle", message, topic)
}

fn vehicle_monitor(message: &BusMessage, topic: &Topic) -> Result<Event, ContractError> {
    diagnostics("Vehicle Monitor", message, topic)
}

fn zoe_sensors(message: &BusMessage, topic: &Topic) -> Result<Event, ContractError> {
    diagnostics("Zoe Sensors", message, topic)
}

fn zoe_vehicle_info(message: &BusMessage, topic: &Topic) -> Result<Event, ContractError> {
    diagnostics("Zoe Vehicle Info", message, topic)
}
