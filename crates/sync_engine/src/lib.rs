//! # Sync Engine
//!
//! 时间多路复用器：把一个 nuScenes scene 转换为按时间戳排序的单一事件流。
//!
//! 负责：
//! - 关键帧链遍历，时间戳取参考通道的 ego pose
//! - CAN bus 游标在每个关键帧之前合并 ([`MultiStreamMerger`])
//! - 关键帧事件：tf、传感器、pose、gps、标注、地图层
//! - 关键帧之间的非关键帧记录 ([`KeyframeWalker`])
//!
//! ## 使用示例
//!
//! ```ignore
//! use sync_engine::SceneDriver;
//!
//! let driver = SceneDriver::new(&dataset, &bus, &payloads, &maps, config.sync.clone())
//!     .with_cancel(cancel.clone());
//! let report = driver.convert_scene(scene, &mut sink)?;
//! ```

mod bus;
mod cursor;
mod driver;
mod geometry;
mod gps;
mod keyframe;
mod merger;
mod sensor;
mod walker;

pub use bus::{BusChannel, BUS_CHANNELS};
pub use cursor::{Decoder, StreamCursor};
pub use driver::{SceneDriver, SceneReport};
pub use geometry::{camera_from_lidar, isometry, ImagePoint, Pinhole};
pub use gps::to_lat_lon;
pub use merger::MultiStreamMerger;
pub use sensor::SensorEvents;
pub use walker::{ChannelChain, KeyframeWalker};
