//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{ConversionConfig, SinkType};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    dataset_root: String,
    dataset_versions: Vec<String>,
    output_dir: String,
    compression: String,
    scene_filter: usize,
    sink_count: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", config.version),
                    dataset_root: config.dataset.root.display().to_string(),
                    dataset_versions: config.dataset.versions.clone(),
                    output_dir: config.output.dir.display().to_string(),
                    compression: format!("{:?}", config.output.compression),
                    scene_filter: config.sync.scenes.len(),
                    sink_count: config.sinks.len(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Non-fatal issues
fn collect_warnings(config: &ConversionConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if !config.sinks.iter().any(|s| s.sink_type == SinkType::Mcap) {
        warnings.push("No mcap sink configured - no recordings will be written".to_string());
    }

    if !config.dataset.root.exists() {
        warnings.push(format!(
            "Dataset root {} does not exist",
            config.dataset.root.display()
        ));
    }

    if config.sync.lidar_channel != config.sync.reference_channel {
        warnings.push(format!(
            "Overlays use '{}' while keyframes are stamped by '{}'",
            config.sync.lidar_channel, config.sync.reference_channel
        ));
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Dataset: {} {:?}", summary.dataset_root, summary.dataset_versions);
            println!("  Output: {} ({})", summary.output_dir, summary.compression);
            println!("  Scene filter: {}", summary.scene_filter);
            println!("  Sinks: {}", summary.sink_count);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
