//! # Ingestion
//!
//! Dataset-side collaborators of the converter.
//!
//! Responsibilities:
//! - Load the nuScenes metadata tables into a [`NuScenesDataset`]
//! - Read per-scene CAN bus groups ([`NuScenesCanBus`])
//! - Decode sensor files into `SensorPayload`s ([`FilePayloadSource`])
//! - Rasterize map layers ([`BasemapLayers`])
//!
//! ## Usage Example
//!
//! ```ignore
//! use contracts::DatasetReader;
//! use ingestion::{FilePayloadSource, NuScenesDataset};
//!
//! let dataset = NuScenesDataset::open("/work/data", "v1.0-mini")?;
//! let payloads = FilePayloadSource::new(dataset.root());
//! for scene in dataset.scenes() {
//!     println!("{}: {} samples", scene.name, scene.nbr_samples);
//! }
//! ```
//!
//! ## Mock Testing
//!
//! ```ignore
//! use ingestion::{MemoryDataset, MemoryPayloadSource};
//!
//! let dataset = MemoryDataset::builder("v1.0-test")
//!     .scene("scene-0001", "boston-seaport", |s| {
//!         s.channel("LIDAR_TOP", SensorModality::Lidar).keyframe(1_000_000)
//!     })
//!     .build();
//! ```

pub mod adapters;
mod can_bus;
mod dataset;
mod error;
mod map;
mod mock;
mod tables;

// Re-exports
pub use adapters::FilePayloadSource;
pub use can_bus::NuScenesCanBus;
pub use dataset::NuScenesDataset;
pub use error::{IngestionError, Result};
pub use map::{BasemapLayers, BasemapSceneMap, BlankMap, BASEMAP_RESOLUTION};
pub use mock::{
    MemoryCanBus, MemoryDataset, MemoryDatasetBuilder, MemoryPayloadSource, SceneSpec,
    MOCK_INTRINSIC,
};
