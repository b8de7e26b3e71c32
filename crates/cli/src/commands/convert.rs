//! `convert` command implementation.

use anyhow::{Context, Result};
use contracts::{CancelFlag, ConversionConfig};
use tracing::{info, warn};

use crate::cli::ConvertArgs;
use crate::error::CliError;
use crate::pipeline::Orchestrator;

/// Execute the `convert` command
pub async fn run_convert(args: &ConvertArgs) -> Result<()> {
    let config = load_config(args)?;

    info!(
        root = %config.dataset.root.display(),
        versions = ?config.dataset.versions,
        output = %config.output.dir.display(),
        sinks = config.sinks.len(),
        "Configuration loaded"
    );

    if args.dry_run {
        println!("{}", config_loader::ConfigLoader::to_toml(&config)?);
        info!("Dry run: configuration is valid");
        return Ok(());
    }

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)
            .context("Failed to start metrics endpoint")?;
    }

    let cancel = CancelFlag::new();
    let signal = tokio::spawn(setup_shutdown_signal(cancel.clone()));

    let orchestrator = Orchestrator::new(config, cancel).list_only(args.list_only);
    let outcome = tokio::task::spawn_blocking(move || orchestrator.run())
        .await
        .map_err(|e| CliError::worker(e.to_string()))?;
    signal.abort();

    match outcome {
        Ok(stats) => {
            if !args.list_only {
                stats.print_summary();
            }
            info!(
                converted = stats.aggregator.scenes_converted,
                failed = stats.aggregator.scenes_failed,
                "Conversion complete"
            );
            Ok(())
        }
        Err(CliError::Cancelled) => {
            warn!("Conversion cancelled; the scene in progress was discarded");
            Err(CliError::Cancelled.into())
        }
        Err(e) => Err(e.into()),
    }
}

/// File (or defaults), then CLI overrides, then validation
fn load_config(args: &ConvertArgs) -> Result<ConversionConfig> {
    let mut config = match &args.config {
        Some(path) => {
            if !path.exists() {
                return Err(CliError::config_not_found(path.display().to_string()).into());
            }
            info!(config = %path.display(), "Loading configuration");
            config_loader::ConfigLoader::load_from_path(path).map_err(CliError::Config)?
        }
        None => ConversionConfig::default(),
    };
    apply_overrides(&mut config, args);
    config_loader::ConfigLoader::validate(&config).map_err(CliError::Config)?;
    Ok(config)
}

fn apply_overrides(config: &mut ConversionConfig, args: &ConvertArgs) {
    if let Some(root) = &args.data_dir {
        config.dataset.root = root.clone();
    }
    if !args.dataset_names.is_empty() {
        config.dataset.versions = args.dataset_names.clone();
    }
    if let Some(dir) = &args.output_dir {
        config.output.dir = dir.clone();
    }
    if let Some(compression) = args.compression {
        config.output.compression = compression;
    }
    if !args.scenes.is_empty() {
        config.sync.scenes = args.scenes.clone();
    }
    if args.no_can_bus {
        config.sync.include_can_bus = false;
    }
    if args.no_map {
        config.sync.include_map = false;
    }
}

/// Cancel on Ctrl-C or SIGTERM
async fn setup_shutdown_signal(cancel: CancelFlag) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, finishing current keyframe"),
        _ = terminate => info!("Received SIGTERM, finishing current keyframe"),
    }
    cancel.cancel();
}
