//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use contracts::Compression;
use std::path::PathBuf;

/// nuScenes to MCAP converter
#[derive(Parser, Debug)]
#[command(
    name = "nuscenes2mcap",
    author,
    version,
    about = "Convert nuScenes scenes into MCAP recordings",
    long_about = "Converts nuScenes dataset scenes into ROS 2 profile MCAP files.\n\n\
                  Every scene becomes one recording holding sensor data, transforms, \n\
                  annotations, map layers and CAN bus signals in timestamp order."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "NUSCENES2MCAP_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Convert scenes to MCAP
    Convert(ConvertArgs),

    /// Validate configuration file without converting
    Validate(ValidateArgs),
}

/// Arguments for the `convert` command
#[derive(Parser, Debug, Clone, Default)]
pub struct ConvertArgs {
    /// Path to configuration file (TOML or JSON); defaults apply without one
    #[arg(short, long, env = "NUSCENES2MCAP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Specific scene(s) to write (default: all)
    #[arg(short, long = "scene", num_args = 1.., value_delimiter = ',')]
    pub scenes: Vec<String>,

    /// List the scenes and exit
    #[arg(long)]
    pub list_only: bool,

    /// Path to the nuScenes data directory
    #[arg(short, long, env = "NUSCENES_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Dataset version(s) to convert
    #[arg(short = 'n', long = "dataset-name", num_args = 1..)]
    pub dataset_names: Vec<String>,

    /// Directory to write MCAP files into
    #[arg(short, long, env = "NUSCENES2MCAP_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Chunk compression (none|lz4|zstd)
    #[arg(long)]
    pub compression: Option<Compression>,

    /// Skip CAN bus topics
    #[arg(long)]
    pub no_can_bus: bool,

    /// Skip map layers
    #[arg(long)]
    pub no_map: bool,

    /// Print the effective configuration and exit
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "NUSCENES2MCAP_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "nuscenes2mcap.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
