//! Scene driver: one scene in, one ordered event stream out
//!
//! Every keyframe writes three batches, each sorted on its own:
//! 1. bus events up to the keyframe stamp, at their own timestamps
//! 2. keyframe events at the keyframe stamp
//! 3. non-keyframe records up to the next keyframe, at their own timestamps
//!
//! `/map` and `/semantic_map` come first, stamped with the first keyframe.

use std::time::Instant;

use contracts::{
    sort_batch, Bounds2, BusMessage, CanBusReader, CancelFlag, ContractError, DatasetReader,
    EgoPose, Event, EventSink, MapLayers, PayloadSource, Sample, Scene, SceneMap, SensorModality,
    SyncConfig, Timestamped,
};
use tracing::{debug, info, instrument};

use crate::keyframe;
use crate::merger::MultiStreamMerger;
use crate::sensor::SensorEvents;
use crate::walker::{ChannelChain, KeyframeWalker};

/// Margin around the ego trajectory covered by `/map`, meters
const MAP_MARGIN: f64 = 50.0;

/// What one scene produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SceneReport {
    pub scene: String,
    pub keyframes: u64,
    /// `/map` and `/semantic_map`
    pub map_events: u64,
    pub bus_events: u64,
    pub keyframe_events: u64,
    pub walker_events: u64,
    /// Records skipped because their payload could not be decoded
    pub decode_failures: u64,
    pub duration_ms: u64,
}

impl SceneReport {
    /// Events written to the sink
    pub fn events(&self) -> u64 {
        self.map_events + self.bus_events + self.keyframe_events + self.walker_events
    }
}

/// Drives the conversion of single scenes
pub struct SceneDriver<'a> {
    dataset: &'a dyn DatasetReader,
    bus: &'a dyn CanBusReader,
    payloads: &'a dyn PayloadSource,
    maps: &'a dyn MapLayers,
    options: SyncConfig,
    cancel: CancelFlag,
}

impl<'a> SceneDriver<'a> {
    pub fn new(
        dataset: &'a dyn DatasetReader,
        bus: &'a dyn CanBusReader,
        payloads: &'a dyn PayloadSource,
        maps: &'a dyn MapLayers,
        options: SyncConfig,
    ) -> Self {
        Self {
            dataset,
            bus,
            payloads,
            maps,
            options,
            cancel: CancelFlag::new(),
        }
    }

    /// Poll `cancel` between keyframes
    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn options(&self) -> &SyncConfig {
        &self.options
    }

    /// Convert `scene` into `sink`
    ///
    /// The sink is flushed but not closed; finalizing or discarding it is
    /// up to the caller.
    ///
    /// # Errors
    /// Dataset integrity problems, bus read failures, sink failures and
    /// `ContractError::Cancelled`. Undecodable payloads are skipped and
    /// counted in the report instead.
    #[instrument(
        name = "convert_scene",
        skip(self, scene, sink),
        fields(scene = %scene.name, sink = sink.name())
    )]
    pub fn convert_scene(
        &self,
        scene: &Scene,
        sink: &mut dyn EventSink,
    ) -> Result<SceneReport, ContractError> {
        let started = Instant::now();
        let dataset = self.dataset;
        let mut report = SceneReport {
            scene: scene.name.clone(),
            ..SceneReport::default()
        };

        let log = dataset.log(&scene.log_token)?;
        let samples = dataset.scene_samples(scene)?;
        let anchors = samples
            .iter()
            .map(|sample| self.reference_pose(sample))
            .collect::<Result<Vec<_>, _>>()?;

        let map: Option<Box<dyn SceneMap>> = if self.options.include_map {
            Some(self.maps.load(&log.location)?)
        } else {
            None
        };
        let mut merger = if self.options.include_can_bus {
            MultiStreamMerger::<BusMessage>::for_scene(self.bus, &scene.name)?
        } else {
            MultiStreamMerger::default()
        };
        let lidar_chain = match samples.first() {
            Some(first) => dataset
                .keyframe_record(first, &self.options.lidar_channel)?
                .map(|anchor| ChannelChain::load(dataset, anchor))
                .transpose()?,
            None => None,
        };
        let walker = KeyframeWalker::new(dataset, lidar_chain);
        let mut sensors = SensorEvents::new(dataset, self.payloads);

        if let (Some(map), Some(first)) = (map.as_deref(), anchors.first()) {
            let bounds = trajectory_bounds(&anchors);
            let stamp = first.timestamp_ns();
            let batch = [
                keyframe::scene_map(map, &bounds, stamp)?,
                keyframe::semantic_map(map, &bounds, stamp)?,
            ];
            sink.write_batch(&batch)?;
            report.map_events = batch.len() as u64;
        }

        for (sample, ego) in samples.iter().zip(&anchors) {
            if self.cancel.is_cancelled() {
                info!(keyframes = report.keyframes, "cancelled");
                return Err(ContractError::Cancelled);
            }
            let stamp = ego.timestamp_ns();

            // bus messages are logged at the keyframe, their header keeps the CAN time
            let mut bus = merger.advance_to(stamp)?;
            for event in &mut bus {
                event.timestamp_ns = stamp;
            }
            sink.write_batch(&bus)?;

            let fixed = self.keyframe_events(
                sample,
                ego,
                &log.location,
                map.as_deref(),
                stamp,
                &mut sensors,
            )?;
            sink.write_batch(&fixed)?;

            let sweeps = walker.walk(sample, &mut sensors)?;
            sink.write_batch(&sweeps)?;

            debug!(
                sample = %sample.token,
                stamp,
                bus = bus.len(),
                keyframe = fixed.len(),
                sweeps = sweeps.len(),
                "keyframe written"
            );
            observability::record_keyframe(&scene.name);
            report.keyframes += 1;
            report.bus_events += bus.len() as u64;
            report.keyframe_events += fixed.len() as u64;
            report.walker_events += sweeps.len() as u64;
        }

        sink.flush()?;
        report.decode_failures = sensors.decode_failures() + merger.failures();
        report.duration_ms = started.elapsed().as_millis() as u64;
        info!(
            keyframes = report.keyframes,
            events = report.events(),
            decode_failures = report.decode_failures,
            duration_ms = report.duration_ms,
            "scene converted"
        );
        Ok(report)
    }

    /// Ego pose of the reference channel's keyframe record
    fn reference_pose(&self, sample: &Sample) -> Result<&'a EgoPose, ContractError> {
        let dataset = self.dataset;
        let record = dataset
            .keyframe_record(sample, &self.options.reference_channel)?
            .ok_or_else(|| {
                ContractError::malformed_link(
                    "sample",
                    &sample.token,
                    format!("no '{}' record", self.options.reference_channel),
                )
            })?;
        dataset.ego_pose_of(record)
    }

    /// Everything stamped with the keyframe time, sorted
    fn keyframe_events(
        &self,
        sample: &Sample,
        ego: &EgoPose,
        location: &str,
        map: Option<&dyn SceneMap>,
        stamp: u64,
        sensors: &mut SensorEvents<'_>,
    ) -> Result<Vec<Event>, ContractError> {
        let dataset = self.dataset;
        let mut batch = vec![keyframe::transforms(dataset, sample, ego, stamp)?];
        if let Some(map) = map {
            batch.extend(keyframe::drivable_area(map, ego, stamp)?);
        }

        let overlay = dataset.keyframe_record(sample, &self.options.lidar_channel)?;
        for token in sample.data.values() {
            let record = dataset.sample_data(token)?;
            let lidar = match record.modality {
                SensorModality::Camera => overlay,
                SensorModality::Lidar | SensorModality::Radar => None,
            };
            batch.extend(sensors.record_events(record, stamp, lidar)?);
        }

        batch.push(keyframe::pose(stamp)?);
        batch.extend(keyframe::gps_fix(location, ego, stamp)?);
        batch.push(keyframe::annotations(dataset, sample, stamp)?);
        sort_batch(&mut batch);
        Ok(batch)
    }
}

fn trajectory_bounds(anchors: &[&EgoPose]) -> Bounds2 {
    Bounds2::from_points(anchors.iter().map(|ego| [ego.translation[0], ego.translation[1]]))
        .unwrap_or(Bounds2 {
            min: [0.0, 0.0],
            max: [0.0, 0.0],
        })
        .expand(MAP_MARGIN)
}
