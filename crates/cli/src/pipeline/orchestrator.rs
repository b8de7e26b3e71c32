//! Batch orchestration: dataset versions -> scenes -> recordings.

use std::time::Instant;

use contracts::{
    CanBusReader, CancelFlag, ContractError, ConversionConfig, DatasetReader, EventSink,
    MapLayers, PayloadSource, Scene,
};
use dispatcher::{create_dispatcher, SceneTarget};
use ingestion::{BasemapLayers, FilePayloadSource, NuScenesCanBus, NuScenesDataset};
use observability::ConversionAggregator;
use sync_engine::SceneDriver;
use tracing::{error, info, instrument, warn};

use super::RunStats;
use crate::error::{CliError, Result};

/// Data sources of one dataset version
pub struct VersionSources<'a> {
    pub dataset: &'a dyn DatasetReader,
    pub bus: &'a dyn CanBusReader,
    pub payloads: &'a dyn PayloadSource,
    pub maps: &'a dyn MapLayers,
}

/// Converts every selected scene of every configured version
pub struct Orchestrator {
    config: ConversionConfig,
    list_only: bool,
    cancel: CancelFlag,
}

impl Orchestrator {
    pub fn new(config: ConversionConfig, cancel: CancelFlag) -> Self {
        Self {
            config,
            list_only: false,
            cancel,
        }
    }

    /// Print scene listings instead of converting
    pub fn list_only(mut self, list_only: bool) -> Self {
        self.list_only = list_only;
        self
    }

    /// Run all versions
    ///
    /// # Errors
    /// A version that cannot be opened, or cancellation. Scene failures are
    /// only counted.
    pub fn run(&self) -> Result<RunStats> {
        let started = Instant::now();
        let root = &self.config.dataset.root;
        let mut stats = RunStats::default();

        for version in &self.config.dataset.versions {
            let dataset = NuScenesDataset::open(root, version)
                .map_err(|e| CliError::dataset_open(version, e))?;
            stats.versions.push(version.clone());

            if self.list_only {
                print_scene_list(&dataset);
                continue;
            }

            let bus = NuScenesCanBus::new(root);
            let payloads = FilePayloadSource::new(root);
            let maps = BasemapLayers::new(root);
            let sources = VersionSources {
                dataset: &dataset,
                bus: &bus,
                payloads: &payloads,
                maps: &maps,
            };
            let outcome = self.convert_version(&sources, &mut stats.aggregator);
            stats.duration = started.elapsed();
            outcome?;
        }

        stats.duration = started.elapsed();
        Ok(stats)
    }

    /// Convert the selected scenes of one version into `aggregator`
    ///
    /// # Errors
    /// `CliError::Cancelled` once the cancel flag is seen; the scene in
    /// progress is discarded.
    #[instrument(
        name = "convert_version",
        skip(self, sources, aggregator),
        fields(version = sources.dataset.version())
    )]
    pub fn convert_version(
        &self,
        sources: &VersionSources<'_>,
        aggregator: &mut ConversionAggregator,
    ) -> Result<()> {
        let version = sources.dataset.version();
        let scenes = self.selected_scenes(sources.dataset);
        info!(scenes = scenes.len(), "converting version");

        let driver = SceneDriver::new(
            sources.dataset,
            sources.bus,
            sources.payloads,
            sources.maps,
            self.config.sync.clone(),
        )
        .with_cancel(self.cancel.clone());

        for scene in scenes {
            if self.cancel.is_cancelled() {
                warn!(scene = %scene.name, "cancelled before scene");
                return Err(CliError::Cancelled);
            }
            let started = Instant::now();
            let outcome = self.convert_one(&driver, version, scene);
            let duration_ms = started.elapsed().as_secs_f64() * 1000.0;

            match outcome {
                Ok(report) => {
                    aggregator.scene_converted(
                        report.keyframes,
                        report.events(),
                        report.decode_failures,
                        duration_ms,
                    );
                    observability::record_scene_finished(true, duration_ms);
                }
                Err(ContractError::Cancelled) => {
                    observability::record_scene_finished(false, duration_ms);
                    warn!(scene = %scene.name, "scene discarded after cancellation");
                    return Err(CliError::Cancelled);
                }
                Err(e) => {
                    error!(scene = %scene.name, class = ?e.class(), error = %e, "scene failed");
                    aggregator.scene_failed(&scene.name, e.class(), duration_ms);
                    observability::record_scene_finished(false, duration_ms);
                }
            }
        }
        Ok(())
    }

    /// One scene: open sinks, drive, then close or discard
    fn convert_one(
        &self,
        driver: &SceneDriver<'_>,
        version: &str,
        scene: &Scene,
    ) -> std::result::Result<sync_engine::SceneReport, ContractError> {
        let target = SceneTarget {
            output: &self.config.output,
            version,
            scene: &scene.name,
        };
        let mut sinks = create_dispatcher(&self.config.sinks, target)
            .map_err(|e| e.into_contract("dispatcher"))?;

        match driver
            .convert_scene(scene, &mut sinks)
            .and_then(|report| sinks.close().map(|()| report))
        {
            Ok(report) => Ok(report),
            Err(e) => {
                if let Err(discard) = sinks.discard() {
                    warn!(scene = %scene.name, error = %discard, "discard failed");
                }
                Err(e)
            }
        }
    }

    fn selected_scenes<'d>(&self, dataset: &'d dyn DatasetReader) -> Vec<&'d Scene> {
        let filter = &self.config.sync;
        for name in &filter.scenes {
            if dataset.scene_by_name(name).is_none() {
                warn!(scene = %name, version = dataset.version(), "requested scene not found");
            }
        }
        dataset
            .scenes()
            .iter()
            .filter(|scene| filter.selects(&scene.name))
            .collect()
    }
}

fn print_scene_list(dataset: &dyn DatasetReader) {
    println!("{} ({} scenes)", dataset.version(), dataset.scenes().len());
    for scene in dataset.scenes() {
        println!(
            "  {:<12} {:>3} samples  {}",
            scene.name, scene.nbr_samples, scene.description
        );
    }
}
