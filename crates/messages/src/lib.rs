//! # Messages
//!
//! ROS 2 message types written to the recording, their `ros2msg` schema
//! definitions, and CDR encoding into [`contracts::Event`]s.
//!
//! ```
//! use contracts::Topic;
//! use messages::{geometry_msgs::{Pose, PoseStamped}, std_msgs::Header, to_event};
//!
//! let msg = PoseStamped { header: Header::new(1_000, "map"), pose: Pose::identity() };
//! let event = to_event(1_000, &Topic::new("/pose"), &msg).unwrap();
//! assert_eq!(&event.payload[..4], &[0, 1, 0, 0]);
//! ```

mod cdr;
pub mod diagnostic_msgs;
pub mod geometry_msgs;
pub mod nav_msgs;
pub mod schema;
pub mod sensor_msgs;
pub mod std_msgs;
pub mod tf2_msgs;
pub mod topics;
pub mod visualization_msgs;

pub use cdr::{encode, to_event, MessageError, RosMessage};
