//! Run statistics.

use std::time::Duration;

use observability::ConversionAggregator;

/// Statistics from a conversion run
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    /// Dataset versions opened
    pub versions: Vec<String>,

    /// Wall time of the whole run
    pub duration: Duration,

    /// Per-scene outcomes
    pub aggregator: ConversionAggregator,
}

impl RunStats {
    /// Events written per second of wall time
    pub fn events_per_second(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.aggregator.total_events as f64 / secs
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n=== Run Statistics ===");
        println!("Versions: {}", self.versions.join(", "));
        println!("Duration: {:.2}s", self.duration.as_secs_f64());
        println!("Events/s: {:.1}", self.events_per_second());
        println!();
        print!("{}", self.aggregator.summary());
    }
}
