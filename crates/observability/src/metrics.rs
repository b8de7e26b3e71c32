//! 转换指标收集模块
//!
//! `record_*` 函数写入全局 `metrics` recorder (安装了 Prometheus 时导出，
//! 否则为 no-op)。[`ConversionAggregator`] 在内存中保留同样的数据，
//! 用于运行结束时的汇总。

use std::collections::BTreeMap;

use contracts::ErrorClass;
use metrics::{counter, gauge, histogram};

/// 一个关键帧步骤完成
pub fn record_keyframe(scene: &str) {
    counter!("nuscenes2mcap_keyframes_total", "scene" => scene.to_string()).increment(1);
}

/// Bus messages merged from one group
pub fn record_bus_messages(group: &str, count: usize) {
    if count > 0 {
        counter!("nuscenes2mcap_bus_messages_total", "group" => group.to_string())
            .increment(count as u64);
    }
}

/// A record was skipped because its payload could not be decoded
pub fn record_decode_failure(channel: &str) {
    counter!("nuscenes2mcap_decode_failures_total", "channel" => channel.to_string())
        .increment(1);
}

/// An event reached a sink
pub fn record_event_written(sink_name: &str, topic: &str, bytes: usize) {
    counter!(
        "nuscenes2mcap_events_written_total",
        "sink" => sink_name.to_string(),
        "topic" => topic.to_string()
    )
    .increment(1);
    counter!("nuscenes2mcap_bytes_written_total", "sink" => sink_name.to_string())
        .increment(bytes as u64);
}

/// A scene conversion ended
pub fn record_scene_finished(success: bool, duration_ms: f64) {
    let status = if success { "converted" } else { "failed" };
    counter!("nuscenes2mcap_scenes_total", "status" => status).increment(1);
    histogram!("nuscenes2mcap_scene_duration_ms").record(duration_ms);
    gauge!("nuscenes2mcap_last_scene_duration_ms").set(duration_ms);
}

/// Run aggregator
///
/// Aggregates per-scene outcomes in memory for the summary printed at the
/// end of a run.
#[derive(Debug, Clone, Default)]
pub struct ConversionAggregator {
    /// Scenes written
    pub scenes_converted: u64,

    /// Scenes aborted (output discarded)
    pub scenes_failed: u64,

    /// Keyframes over all converted scenes
    pub total_keyframes: u64,

    /// Events over all converted scenes
    pub total_events: u64,

    /// Records skipped for decode errors
    pub decode_failures: u64,

    /// Scene wall time
    pub duration_stats: RunningStats,

    /// Events per converted scene
    pub event_stats: RunningStats,

    /// Failed scene names per error class
    pub failures: BTreeMap<String, Vec<String>>,
}

impl ConversionAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a converted scene
    pub fn scene_converted(
        &mut self,
        keyframes: u64,
        events: u64,
        decode_failures: u64,
        duration_ms: f64,
    ) {
        self.scenes_converted += 1;
        self.total_keyframes += keyframes;
        self.total_events += events;
        self.decode_failures += decode_failures;
        self.duration_stats.push(duration_ms);
        self.event_stats.push(events as f64);
    }

    /// Record a failed scene
    pub fn scene_failed(&mut self, scene: &str, class: ErrorClass, duration_ms: f64) {
        self.scenes_failed += 1;
        self.duration_stats.push(duration_ms);
        self.failures
            .entry(format!("{class:?}"))
            .or_default()
            .push(scene.to_string());
    }

    /// Merge another run (e.g. another dataset version)
    pub fn merge(&mut self, other: &ConversionAggregator) {
        self.scenes_converted += other.scenes_converted;
        self.scenes_failed += other.scenes_failed;
        self.total_keyframes += other.total_keyframes;
        self.total_events += other.total_events;
        self.decode_failures += other.decode_failures;
        self.duration_stats.merge(&other.duration_stats);
        self.event_stats.merge(&other.event_stats);
        for (class, scenes) in &other.failures {
            self.failures
                .entry(class.clone())
                .or_default()
                .extend(scenes.iter().cloned());
        }
    }

    /// Build the summary
    pub fn summary(&self) -> ConversionSummary {
        let attempted = self.scenes_converted + self.scenes_failed;
        ConversionSummary {
            scenes_converted: self.scenes_converted,
            scenes_failed: self.scenes_failed,
            total_keyframes: self.total_keyframes,
            total_events: self.total_events,
            decode_failures: self.decode_failures,
            failure_rate: if attempted > 0 {
                self.scenes_failed as f64 / attempted as f64 * 100.0
            } else {
                0.0
            },
            scene_duration_ms: StatsSummary::from(&self.duration_stats),
            events_per_scene: StatsSummary::from(&self.event_stats),
            failures: self.failures.clone(),
        }
    }
}

/// Run summary
#[derive(Debug, Clone, Default)]
pub struct ConversionSummary {
    pub scenes_converted: u64,
    pub scenes_failed: u64,
    pub total_keyframes: u64,
    pub total_events: u64,
    pub decode_failures: u64,
    pub failure_rate: f64,
    pub scene_duration_ms: StatsSummary,
    pub events_per_scene: StatsSummary,
    pub failures: BTreeMap<String, Vec<String>>,
}

impl std::fmt::Display for ConversionSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Conversion Summary ===")?;
        writeln!(f, "Scenes converted: {}", self.scenes_converted)?;
        writeln!(
            f,
            "Scenes failed: {} ({:.2}%)",
            self.scenes_failed, self.failure_rate
        )?;
        writeln!(f, "Keyframes: {}", self.total_keyframes)?;
        writeln!(f, "Events: {}", self.total_events)?;
        writeln!(f, "Skipped records: {}", self.decode_failures)?;
        writeln!(f, "Scene time (ms): {}", self.scene_duration_ms)?;
        writeln!(f, "Events per scene: {}", self.events_per_scene)?;

        if !self.failures.is_empty() {
            writeln!(f, "Failed scenes:")?;
            for (class, scenes) in &self.failures {
                writeln!(f, "  {}: {}", class, scenes.join(", "))?;
            }
        }

        Ok(())
    }
}

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.1}, max={:.1}, mean={:.1}, std={:.1} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    /// Combine two accumulators (Chan et al.)
    pub fn merge(&mut self, other: &RunningStats) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            *self = other.clone();
            return;
        }
        let count = self.count + other.count;
        let delta = other.mean - self.mean;
        self.mean += delta * other.count as f64 / count as f64;
        self.m2 += other.m2 + delta * delta * (self.count * other.count) as f64 / count as f64;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
        self.count = count;
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();
        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            stats.push(v);
        }

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 5.0).abs() < 1e-10);
        assert!((stats.variance() - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_running_stats_merge_matches_single_pass() {
        let mut left = RunningStats::default();
        let mut right = RunningStats::default();
        let mut all = RunningStats::default();
        for v in [1.0, 2.0] {
            left.push(v);
            all.push(v);
        }
        for v in [3.0, 4.0, 5.0] {
            right.push(v);
            all.push(v);
        }
        left.merge(&right);
        assert_eq!(left.count(), all.count());
        assert!((left.mean() - all.mean()).abs() < 1e-10);
        assert!((left.variance() - all.variance()).abs() < 1e-10);
        assert!((left.max() - 5.0).abs() < 1e-10);
    }

    #[test]
    fn test_aggregator_summary() {
        let mut aggregator = ConversionAggregator::new();
        aggregator.scene_converted(40, 1200, 2, 850.0);
        aggregator.scene_converted(39, 1100, 0, 800.0);
        aggregator.scene_failed("scene-0553", ErrorClass::DatasetIntegrity, 10.0);

        let summary = aggregator.summary();
        assert_eq!(summary.scenes_converted, 2);
        assert_eq!(summary.scenes_failed, 1);
        assert_eq!(summary.total_keyframes, 79);
        assert_eq!(summary.total_events, 2300);
        assert_eq!(summary.decode_failures, 2);
        assert!((summary.failure_rate - 100.0 / 3.0).abs() < 1e-9);
        assert_eq!(
            summary.failures.get("DatasetIntegrity"),
            Some(&vec!["scene-0553".to_string()])
        );

        let text = summary.to_string();
        assert!(text.contains("Scenes converted: 2"));
        assert!(text.contains("DatasetIntegrity: scene-0553"));
    }

    #[test]
    fn test_aggregator_merge() {
        let mut mini = ConversionAggregator::new();
        mini.scene_converted(10, 100, 0, 1.0);
        let mut trainval = ConversionAggregator::new();
        trainval.scene_failed("scene-0001", ErrorClass::Sink, 2.0);

        mini.merge(&trainval);
        assert_eq!(mini.scenes_converted, 1);
        assert_eq!(mini.scenes_failed, 1);
        assert_eq!(mini.duration_stats.count(), 2);
    }

    #[test]
    fn test_record_functions_without_recorder() {
        // no recorder installed: calls are no-ops
        record_keyframe("scene-0061");
        record_bus_messages("pose", 3);
        record_decode_failure("CAM_FRONT");
        record_event_written("mcap", "/tf", 128);
        record_scene_finished(true, 12.5);
    }
}
