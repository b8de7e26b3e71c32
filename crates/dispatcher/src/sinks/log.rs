//! LogSink - logs event summaries via tracing

use std::collections::BTreeMap;

use contracts::{ContractError, Event, EventSink};
use tracing::{debug, info, instrument};

/// Sink that logs events for debugging; writes nothing to disk
pub struct LogSink {
    name: String,
    /// Events and payload bytes per topic
    topics: BTreeMap<String, (u64, u64)>,
}

impl LogSink {
    /// Create a new LogSink with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            topics: BTreeMap::new(),
        }
    }

    /// Events seen per topic
    pub fn topic_counts(&self) -> impl Iterator<Item = (&str, u64)> {
        self.topics
            .iter()
            .map(|(topic, (events, _))| (topic.as_str(), *events))
    }
}

impl EventSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn write(&mut self, event: &Event) -> Result<(), ContractError> {
        debug!(
            sink = %self.name,
            topic = %event.topic,
            timestamp_ns = event.timestamp_ns,
            schema = event.schema.name,
            bytes = event.payload.len(),
            "event"
        );
        let entry = self.topics.entry(event.topic.to_string()).or_default();
        entry.0 += 1;
        entry.1 += event.payload.len() as u64;
        observability::record_event_written(&self.name, &event.topic, event.payload.len());
        Ok(())
    }

    fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    #[instrument(name = "log_sink_close", skip(self))]
    fn close(&mut self) -> Result<(), ContractError> {
        for (topic, (events, bytes)) in &self.topics {
            info!(sink = %self.name, topic, events, bytes, "topic summary");
        }
        info!(sink = %self.name, topics = self.topics.len(), "LogSink closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::MessageSchema;

    static SCHEMA: MessageSchema = MessageSchema {
        name: "std_msgs/msg/Empty",
        definition: "",
    };

    #[test]
    fn test_log_sink_counts_topics() {
        let mut sink = LogSink::new("test_log");
        sink.write(&Event::new(1, "/a", &SCHEMA, vec![1, 2])).unwrap();
        sink.write(&Event::new(2, "/a", &SCHEMA, vec![3])).unwrap();
        sink.write(&Event::new(2, "/b", &SCHEMA, Vec::new())).unwrap();
        sink.close().unwrap();

        let counts: Vec<(&str, u64)> = sink.topic_counts().collect();
        assert_eq!(counts, vec![("/a", 2), ("/b", 1)]);
    }

    #[test]
    fn test_log_sink_name() {
        let sink = LogSink::new("my_logger");
        assert_eq!(sink.name(), "my_logger");
    }
}
