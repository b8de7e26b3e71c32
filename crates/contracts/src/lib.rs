//! # Contracts
//!
//! Frozen interface contracts, defining inter-module data structures and traits.
//! All business crates depend on this crate; reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Dataset timestamps are microseconds since the epoch
//! - Every [`Event`] carries nanoseconds (`micros * 1000`)

mod bus;
mod config;
mod dataset;
mod error;
mod event;
mod map;
mod runtime;
mod sensor;
mod sink;
mod topic;

pub use bus::*;
pub use config::*;
pub use dataset::*;
pub use error::*;
pub use event::*;
pub use map::*;
pub use runtime::*;
pub use sensor::*;
pub use sink::*;
pub use topic::Topic;
