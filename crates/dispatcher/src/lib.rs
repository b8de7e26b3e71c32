//! # Dispatcher
//!
//! 数据分发模块。
//!
//! 负责：
//! - 为单个 scene 构建配置中的 sinks
//! - 按到达顺序 Fan-out 每个 `Event` 到所有 sinks
//! - 整体提交 (close) 或丢弃 (discard) 一个 scene 的输出

pub mod dispatcher;
pub mod error;
pub mod sinks;

pub use contracts::{Event, EventSink};
pub use dispatcher::{create_dispatcher, Dispatcher, DispatcherBuilder, SceneTarget};
pub use error::DispatcherError;
pub use sinks::{LogSink, McapOptions, McapSink, MemoryRecording, MemorySink, SinkState};
