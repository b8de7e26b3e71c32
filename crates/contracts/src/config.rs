//! ConversionConfig - Config Loader output
//!
//! Describes one conversion run: dataset location, output container
//! settings, multiplexer options and output routing.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use validator::Validate;

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete conversion configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ConversionConfig {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Dataset location
    #[serde(default)]
    #[validate(nested)]
    pub dataset: DatasetConfig,

    /// Output container settings
    #[serde(default)]
    #[validate(nested)]
    pub output: OutputConfig,

    /// Multiplexer options
    #[serde(default)]
    #[validate(nested)]
    pub sync: SyncConfig,

    /// Output routing
    #[serde(default = "default_sinks")]
    pub sinks: Vec<SinkConfig>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            version: ConfigVersion::V1,
            dataset: DatasetConfig::default(),
            output: OutputConfig::default(),
            sync: SyncConfig::default(),
            sinks: default_sinks(),
        }
    }
}

/// Dataset root and versions
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DatasetConfig {
    /// Directory holding `<version>/`, `can_bus/` and `maps/`
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Dataset versions to convert (e.g. `v1.0-mini`)
    #[serde(default = "default_versions")]
    #[validate(length(min = 1, message = "at least one dataset version is required"))]
    pub versions: Vec<String>,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            versions: default_versions(),
        }
    }
}

fn default_root() -> PathBuf {
    PathBuf::from("/work/data")
}

fn default_versions() -> Vec<String> {
    vec!["v1.0-mini".to_string()]
}

/// Output container settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct OutputConfig {
    /// Output directory
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,

    /// File name prefix: `<prefix>-<version>-<scene>.mcap`
    #[serde(default = "default_file_prefix")]
    #[validate(length(min = 1, message = "file prefix must not be empty"))]
    pub file_prefix: String,

    /// Chunk compression
    #[serde(default)]
    pub compression: Compression,

    /// Chunk size in bytes (writer default when unset)
    #[serde(default)]
    #[validate(range(min = 1024, message = "chunk size must be at least 1 KiB"))]
    pub chunk_size: Option<u64>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            file_prefix: default_file_prefix(),
            compression: Compression::default(),
            chunk_size: None,
        }
    }
}

impl OutputConfig {
    /// Recording path for one scene
    pub fn scene_path(&self, version: &str, scene_name: &str) -> PathBuf {
        self.dir
            .join(format!("{}-{}-{}.mcap", self.file_prefix, version, scene_name))
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_file_prefix() -> String {
    "NuScenes".to_string()
}

/// Chunk compression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Compression {
    None,
    Lz4,
    #[default]
    Zstd,
}

impl std::str::FromStr for Compression {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "lz4" => Ok(Self::Lz4),
            "zstd" => Ok(Self::Zstd),
            other => Err(format!("unknown compression '{other}' (none|lz4|zstd)")),
        }
    }
}

/// Multiplexer options
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SyncConfig {
    /// Channel whose ego pose stamps each keyframe
    #[serde(default = "default_lidar_channel")]
    #[validate(length(min = 1, message = "reference channel must not be empty"))]
    pub reference_channel: String,

    /// Channel used for camera overlays
    #[serde(default = "default_lidar_channel")]
    #[validate(length(min = 1, message = "lidar channel must not be empty"))]
    pub lidar_channel: String,

    /// Merge CAN bus streams
    #[serde(default = "default_true")]
    pub include_can_bus: bool,

    /// Emit map layers
    #[serde(default = "default_true")]
    pub include_map: bool,

    /// Scene filter (empty = all scenes)
    #[serde(default)]
    pub scenes: Vec<String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            reference_channel: default_lidar_channel(),
            lidar_channel: default_lidar_channel(),
            include_can_bus: true,
            include_map: true,
            scenes: Vec::new(),
        }
    }
}

impl SyncConfig {
    /// Whether a scene passes the filter
    pub fn selects(&self, scene_name: &str) -> bool {
        self.scenes.is_empty() || self.scenes.iter().any(|s| s == scene_name)
    }
}

fn default_lidar_channel() -> String {
    "LIDAR_TOP".to_string()
}

fn default_true() -> bool {
    true
}

/// Sink output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Sink name
    pub name: String,

    /// Sink type
    pub sink_type: SinkType,

    /// Type-specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

fn default_sinks() -> Vec<SinkConfig> {
    vec![SinkConfig {
        name: "mcap".to_string(),
        sink_type: SinkType::Mcap,
        params: HashMap::new(),
    }]
}

/// Sink type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// MCAP recording (one file per scene)
    Mcap,
    /// Log output
    Log,
}
