//! # Integration Tests
//!
//! 集成测试与端到端测试 (内存数据集)。
//!
//! 负责：
//! - 游标、merger、walker 的排序性质
//! - 经过 driver 和 dispatcher 的 scene 场景
//! - 从磁盘读回 MCAP 输出

#[cfg(test)]
mod fixtures {
    use contracts::{BusMessage, BusValue, DatasetReader, SensorModality, SyncConfig};
    use dispatcher::{DispatcherBuilder, MemoryRecording, MemorySink};
    use ingestion::{BlankMap, MemoryCanBus, MemoryDataset, MemoryPayloadSource};
    use sync_engine::{SceneDriver, SceneReport};

    pub const SCENE: &str = "scene-0061";

    /// Two keyframes, lidar at 20 Hz, one camera at 12 Hz in between
    pub fn two_keyframes() -> MemoryDataset {
        MemoryDataset::builder("v1.0-test")
            .scene(SCENE, "singapore-onenorth", |s| {
                s.channel("LIDAR_TOP", SensorModality::Lidar)
                    .channel("CAM_FRONT", SensorModality::Camera)
                    .channel("RADAR_FRONT", SensorModality::Radar)
                    .keyframe(1_000_000)
                    .annotation("vehicle.car", [410.0, 1200.0, 1.0])
                    .annotation("human.pedestrian.adult", [420.0, 1190.0, 1.0])
                    .sweep("LIDAR_TOP", 1_050_000)
                    .sweep("CAM_FRONT", 1_083_000)
                    .sweep("RADAR_FRONT", 1_077_000)
                    .sweep("LIDAR_TOP", 1_100_000)
                    .sweep("CAM_FRONT", 1_166_000)
                    .sweep("LIDAR_TOP", 1_150_000)
                    .keyframe(1_500_000)
                    .sweep("LIDAR_TOP", 1_550_000)
            })
            .build()
    }

    pub fn diagnostics(utime: u64, value: f64) -> BusMessage {
        BusMessage::new(utime).with("value", BusValue::Scalar(value))
    }

    pub fn bus() -> MemoryCanBus {
        MemoryCanBus::new()
            .with_messages(
                SCENE,
                "zoesensors",
                vec![
                    diagnostics(950_000, 1.0),
                    diagnostics(1_250_000, 2.0),
                    diagnostics(1_600_000, 3.0),
                ],
            )
            .with_messages(
                SCENE,
                "vehicle_monitor",
                vec![diagnostics(980_000, 4.0), diagnostics(1_400_000, 5.0)],
            )
    }

    pub fn convert_into_memory(
        dataset: &MemoryDataset,
        bus: &MemoryCanBus,
        payloads: &MemoryPayloadSource,
    ) -> (SceneReport, MemoryRecording) {
        let sink = MemorySink::new("memory");
        let recording = sink.recording();
        let mut dispatcher = DispatcherBuilder::new().sink(sink).build();
        let driver = SceneDriver::new(dataset, bus, payloads, &BlankMap, SyncConfig::default());
        let scene = dataset.scene_by_name(SCENE).unwrap();
        let report = driver.convert_scene(scene, &mut dispatcher).unwrap();
        contracts::EventSink::close(&mut dispatcher).unwrap();
        (report, recording)
    }
}

#[cfg(test)]
mod ordering_tests {
    use contracts::{DatasetReader, Timestamped, Topic};
    use ingestion::{MemoryDataset, MemoryPayloadSource};
    use sync_engine::{
        ChannelChain, KeyframeWalker, MultiStreamMerger, SensorEvents, StreamCursor, BUS_CHANNELS,
    };

    use crate::fixtures::*;

    #[test]
    fn test_merger_batches_are_sorted() {
        let bus = bus();
        let mut merger = MultiStreamMerger::for_scene(&bus, SCENE).unwrap();
        for target in [1_000_000_000, 1_500_000_000, u64::MAX] {
            let batch = merger.advance_to(target).unwrap();
            assert!(batch.windows(2).all(|w| w[0].timestamp_ns <= w[1].timestamp_ns));
            assert!(batch.iter().all(|e| e.timestamp_ns < target));
        }
    }

    #[test]
    fn test_merger_ties_follow_group_order() {
        // same instant on two groups: vehicle_monitor is enumerated first
        let bus = ingestion::MemoryCanBus::new()
            .with_messages(SCENE, "zoesensors", vec![diagnostics(900_000, 1.0)])
            .with_messages(SCENE, "vehicle_monitor", vec![diagnostics(900_000, 2.0)]);
        let mut merger = MultiStreamMerger::for_scene(&bus, SCENE).unwrap();
        let batch = merger.advance_to(1_000_000_000).unwrap();
        assert_eq!(batch.len(), 2);

        let vehicle_monitor = BUS_CHANNELS
            .iter()
            .find(|c| c.group == "vehicle_monitor")
            .unwrap();
        let topic = Topic::new("/diagnostics");
        let expected = (vehicle_monitor.decode)(&diagnostics(900_000, 2.0), &topic).unwrap();
        assert_eq!(batch[0].payload, expected.payload);
    }

    #[test]
    fn test_cursor_never_rewinds() {
        let channel = BUS_CHANNELS.iter().find(|c| c.group == "zoesensors").unwrap();
        let messages: Vec<_> = (0..20).map(|i| diagnostics(1_000 * i, i as f64)).collect();
        let mut cursor = StreamCursor::new(
            channel.group,
            Topic::new(channel.topic),
            messages.clone(),
            channel.decode,
        );

        let mut emitted = Vec::new();
        let mut last_index = 0;
        for target_ns in [0, 3_500_000, 3_500_000, 9_000_000, 9_000_001, u64::MAX] {
            emitted.extend(cursor.advance_to(target_ns).unwrap());
            assert!(cursor.index() >= last_index);
            last_index = cursor.index();
        }
        // an earlier target after the fact emits nothing
        assert!(cursor.advance_to(1_000_000).unwrap().is_empty());

        let stamps: Vec<u64> = emitted.iter().map(|e| e.timestamp_ns).collect();
        let expected: Vec<u64> = messages.iter().map(|m| m.timestamp_ns()).collect();
        assert_eq!(stamps, expected);
        assert_eq!(cursor.remaining(), 0);
    }

    #[test]
    fn test_walker_never_yields_keyframes() {
        let ds = two_keyframes();
        let walker = KeyframeWalker::new(&ds, None);
        for sample in ds.scene_samples(ds.scene_by_name(SCENE).unwrap()).unwrap() {
            let records = walker.non_keyframes(sample).unwrap();
            assert!(records.iter().all(|r| !r.is_key_frame));
        }
    }

    fn lidar_walker(ds: &MemoryDataset) -> KeyframeWalker<'_> {
        let scene = ds.scene_by_name(SCENE).unwrap();
        let first = ds.sample(&scene.first_sample_token).unwrap();
        let anchor = ds.keyframe_record(first, "LIDAR_TOP").unwrap().unwrap();
        KeyframeWalker::new(ds, Some(ChannelChain::load(ds, anchor).unwrap()))
    }

    #[test]
    fn test_nearest_lidar_between_two_records() {
        let ds = two_keyframes();
        let walker = lidar_walker(&ds);

        // lidar at 1_050_000 and 1_100_000 (microseconds)
        let near_first = walker.nearest_lidar(1_060_000_000).unwrap().unwrap();
        assert_eq!(near_first.timestamp, 1_050_000);
        let near_second = walker.nearest_lidar(1_083_000_000).unwrap().unwrap();
        assert_eq!(near_second.timestamp, 1_100_000);
        let tie = walker.nearest_lidar(1_075_000_000).unwrap().unwrap();
        assert_eq!(tie.timestamp, 1_050_000);
    }

    #[test]
    fn test_walker_batch_interleaves_channels() {
        let ds = two_keyframes();
        let walker = lidar_walker(&ds);
        let payloads = MemoryPayloadSource::new();
        let mut sensors = SensorEvents::new(&ds, &payloads);
        let scene = ds.scene_by_name(SCENE).unwrap();
        let first = ds.sample(&scene.first_sample_token).unwrap();

        let batch = walker.walk(first, &mut sensors).unwrap();
        let stamps: Vec<u64> = batch.iter().map(|e| e.timestamp_ns).collect();
        assert!(stamps.windows(2).all(|w| w[0] <= w[1]));
        // 3 lidar + 1 radar + 2 cameras x (image, info, overlay)
        assert_eq!(batch.len(), 10);
        assert_eq!(batch[0].topic, "/LIDAR_TOP");
        assert_eq!(batch[1].topic, "/RADAR_FRONT");
    }
}

#[cfg(test)]
mod scenario_tests {
    use contracts::{CancelFlag, ContractError, Event, EventSink, SensorModality, SyncConfig};
    use dispatcher::{DispatcherBuilder, MemorySink, SinkState};
    use ingestion::{BlankMap, MemoryCanBus, MemoryDataset, MemoryPayloadSource};
    use sync_engine::SceneDriver;

    use crate::fixtures::*;

    #[test]
    fn test_single_keyframe_scene() {
        let ds = MemoryDataset::builder("v1.0-test")
            .scene(SCENE, "boston-seaport", |s| {
                s.channel("LIDAR_TOP", SensorModality::Lidar)
                    .channel("CAM_FRONT", SensorModality::Camera)
                    .keyframe(2_000_000)
                    .annotation("vehicle.car", [600.0, 1600.0, 1.0])
                    .sweep("LIDAR_TOP", 2_050_000)
                    .sweep("CAM_FRONT", 2_040_000)
            })
            .build();
        let (report, recording) =
            convert_into_memory(&ds, &MemoryCanBus::new(), &MemoryPayloadSource::new());
        let events = recording.topic_stamps();
        let keyframe_ns = 2_000_000_000;

        let at_keyframe: Vec<&str> = events
            .iter()
            .filter(|(_, ts)| *ts == keyframe_ns)
            .map(|(topic, _)| topic.as_str())
            .collect();
        assert_eq!(
            at_keyframe,
            vec![
                "/map",
                "/semantic_map",
                "/tf",
                "/CAM_FRONT/image_rect_compressed",
                "/CAM_FRONT/camera_info",
                "/CAM_FRONT/image_markers_lidar",
                "/LIDAR_TOP",
                "/pose",
                "/gps",
                "/markers/annotations",
            ]
        );

        let after: Vec<(&str, u64)> = events
            .iter()
            .filter(|(_, ts)| *ts != keyframe_ns)
            .map(|(topic, ts)| (topic.as_str(), *ts))
            .collect();
        assert_eq!(
            after,
            vec![
                ("/CAM_FRONT/image_rect_compressed", 2_040_000_000),
                ("/CAM_FRONT/camera_info", 2_040_000_000),
                ("/CAM_FRONT/image_markers_lidar", 2_040_000_000),
                ("/LIDAR_TOP", 2_050_000_000),
            ]
        );
        assert_eq!(report.bus_events, 0);
        assert_eq!(report.keyframes, 1);
        assert_eq!(report.events() as usize, events.len());
    }

    #[test]
    fn test_bus_messages_split_at_keyframe() {
        let ds = two_keyframes();
        let (report, recording) = convert_into_memory(&ds, &bus(), &MemoryPayloadSource::new());
        let diagnostics: Vec<u64> = recording
            .topic_stamps()
            .into_iter()
            .filter(|(topic, _)| topic == "/diagnostics")
            .map(|(_, ts)| ts)
            .collect();

        // logged at the keyframe that closes each window; 1_600_000 is never merged
        assert_eq!(
            diagnostics,
            vec![1_000_000_000, 1_000_000_000, 1_500_000_000, 1_500_000_000]
        );
        assert_eq!(report.bus_events, 4);

        // the second keyframe's bus batch is written before its /tf
        let events = recording.topic_stamps();
        let second_tf = events
            .iter()
            .position(|(topic, ts)| topic == "/tf" && *ts == 1_500_000_000)
            .unwrap();
        let late_bus = events
            .iter()
            .position(|(topic, ts)| topic == "/diagnostics" && *ts == 1_500_000_000)
            .unwrap();
        assert!(late_bus < second_tf);

        // no event is logged before the one written ahead of it
        assert!(events.windows(2).all(|w| w[0].1 <= w[1].1));
    }

    #[test]
    fn test_one_failed_camera_of_three() {
        let ds = MemoryDataset::builder("v1.0-test")
            .scene(SCENE, "boston-seaport", |s| {
                s.channel("CAM_BACK", SensorModality::Camera)
                    .channel("CAM_FRONT", SensorModality::Camera)
                    .channel("CAM_FRONT_LEFT", SensorModality::Camera)
                    .channel("LIDAR_TOP", SensorModality::Lidar)
                    .keyframe(3_000_000)
            })
            .build();
        let bus = MemoryCanBus::new();
        let failing = ds.channel_tokens(SCENE, "CAM_FRONT")[0].clone();

        let (_, baseline) = convert_into_memory(&ds, &bus, &MemoryPayloadSource::new());
        let (report, degraded) =
            convert_into_memory(&ds, &bus, &MemoryPayloadSource::new().fail_on(&failing));

        let expected: Vec<(String, u64)> = baseline
            .topic_stamps()
            .into_iter()
            .filter(|(topic, _)| !topic.starts_with("/CAM_FRONT/"))
            .collect();
        assert_eq!(degraded.topic_stamps(), expected);
        assert_eq!(report.decode_failures, 1);
    }

    #[test]
    fn test_rerun_is_identical() {
        let ds = two_keyframes();
        let (_, first) = convert_into_memory(&ds, &bus(), &MemoryPayloadSource::new());
        let (_, second) = convert_into_memory(&ds, &bus(), &MemoryPayloadSource::new());

        assert_eq!(first.topic_stamps(), second.topic_stamps());
        let payloads = |events: Vec<Event>| -> Vec<Vec<u8>> {
            events.into_iter().map(|e| e.payload.to_vec()).collect()
        };
        assert_eq!(payloads(first.events()), payloads(second.events()));
    }

    /// Raises the cancel flag after the first `/tf`
    struct CancelAfterTf {
        inner: MemorySink,
        cancel: CancelFlag,
    }

    impl EventSink for CancelAfterTf {
        fn name(&self) -> &str {
            self.inner.name()
        }

        fn write(&mut self, event: &Event) -> Result<(), ContractError> {
            if event.topic == "/tf" {
                self.cancel.cancel();
            }
            self.inner.write(event)
        }

        fn flush(&mut self) -> Result<(), ContractError> {
            self.inner.flush()
        }

        fn close(&mut self) -> Result<(), ContractError> {
            self.inner.close()
        }

        fn discard(&mut self) -> Result<(), ContractError> {
            self.inner.discard()
        }
    }

    #[test]
    fn test_cancel_mid_scene_discards_output() {
        let ds = two_keyframes();
        let bus = bus();
        let payloads = MemoryPayloadSource::new();
        let cancel = CancelFlag::new();
        let inner = MemorySink::new("memory");
        let recording = inner.recording();
        let mut dispatcher = DispatcherBuilder::new()
            .sink(CancelAfterTf {
                inner,
                cancel: cancel.clone(),
            })
            .build();

        let driver = SceneDriver::new(&ds, &bus, &payloads, &BlankMap, SyncConfig::default())
            .with_cancel(cancel);
        let scene = contracts::DatasetReader::scene_by_name(&ds, SCENE).unwrap();
        let err = driver.convert_scene(scene, &mut dispatcher).unwrap_err();
        assert!(matches!(err, ContractError::Cancelled));
        // the first keyframe went out before the flag was checked again
        assert!(!recording.is_empty());

        dispatcher.discard().unwrap();
        assert!(recording.is_empty());
        assert_eq!(recording.state(), SinkState::Discarded);
    }
}

#[cfg(test)]
mod mcap_tests {
    use std::collections::HashMap;

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{DatasetReader, EventSink};
    use dispatcher::{create_dispatcher, SceneTarget};
    use ingestion::{BlankMap, MemoryPayloadSource};
    use sync_engine::SceneDriver;
    use tempfile::tempdir;

    use crate::fixtures::*;

    #[test]
    fn test_scene_to_mcap_file() {
        let dir = tempdir().unwrap();
        let toml = format!(
            r#"
[output]
dir = "{}"
compression = "lz4"

[sync]
include_map = true

[[sinks]]
name = "recording"
sink_type = "mcap"

[[sinks]]
name = "log"
sink_type = "log"
"#,
            dir.path().display()
        );
        let config = ConfigLoader::load_from_str(&toml, ConfigFormat::Toml).unwrap();

        let ds = two_keyframes();
        let bus = bus();
        let payloads = MemoryPayloadSource::new();
        let driver = SceneDriver::new(&ds, &bus, &payloads, &BlankMap, config.sync.clone());
        let target = SceneTarget {
            output: &config.output,
            version: ds.version(),
            scene: SCENE,
        };
        let mut sinks = create_dispatcher(&config.sinks, target).unwrap();
        let report = driver
            .convert_scene(ds.scene_by_name(SCENE).unwrap(), &mut sinks)
            .unwrap();
        sinks.close().unwrap();

        let path = dir.path().join("NuScenes-v1.0-test-scene-0061.mcap");
        let bytes = std::fs::read(&path).unwrap();
        let mut per_topic: HashMap<String, usize> = HashMap::new();
        let mut count = 0;
        for message in mcap::MessageStream::new(&bytes).unwrap() {
            let message = message.unwrap();
            assert_eq!(message.channel.message_encoding, "cdr");
            *per_topic.entry(message.channel.topic.clone()).or_default() += 1;
            count += 1;
        }

        assert_eq!(count as u64, report.events());
        assert_eq!(per_topic["/map"], 1);
        assert_eq!(per_topic["/tf"], 2);
        assert_eq!(per_topic["/diagnostics"], 4);
        assert_eq!(per_topic["/LIDAR_TOP"], 2 + 4);
    }
}
