//! Dispatcher - fan-out of one scene's events to every configured sink

use contracts::{ContractError, Event, EventSink, OutputConfig, SinkConfig, SinkType};
use tracing::{debug, info, instrument, warn};

use crate::error::DispatcherError;
use crate::sinks::{LogSink, McapOptions, McapSink};

/// Where a scene's sinks write
#[derive(Debug, Clone, Copy)]
pub struct SceneTarget<'a> {
    pub output: &'a OutputConfig,
    pub version: &'a str,
    pub scene: &'a str,
}

/// Builder for creating a Dispatcher
#[derive(Default)]
pub struct DispatcherBuilder {
    sinks: Vec<Box<dyn EventSink>>,
}

impl DispatcherBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sink
    pub fn sink(mut self, sink: impl EventSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    /// Add sinks from configuration
    #[instrument(
        name = "dispatcher_builder_configured",
        skip(self, configs, target),
        fields(sink_count = configs.len(), scene = target.scene)
    )]
    pub fn configured(
        mut self,
        configs: &[SinkConfig],
        target: SceneTarget<'_>,
    ) -> Result<Self, DispatcherError> {
        for config in configs {
            self.sinks.push(create_sink(config, target)?);
        }
        Ok(self)
    }

    pub fn build(self) -> Dispatcher {
        Dispatcher { sinks: self.sinks }
    }
}

/// Create one sink from configuration
///
/// MCAP params: `path` overrides the per-scene file path.
#[instrument(
    name = "dispatcher_create_sink",
    skip(config, target),
    fields(sink = %config.name, sink_type = ?config.sink_type)
)]
fn create_sink(
    config: &SinkConfig,
    target: SceneTarget<'_>,
) -> Result<Box<dyn EventSink>, DispatcherError> {
    match config.sink_type {
        SinkType::Log => Ok(Box::new(LogSink::new(&config.name))),
        SinkType::Mcap => {
            let path = config.params.get("path").map_or_else(
                || target.output.scene_path(target.version, target.scene),
                Into::into,
            );
            let sink = McapSink::create(&config.name, path, McapOptions::from(target.output))?;
            Ok(Box::new(sink))
        }
    }
}

/// Writes every event to all sinks
///
/// A failing sink fails the scene: the error is returned and the caller is
/// expected to `discard`.
pub struct Dispatcher {
    sinks: Vec<Box<dyn EventSink>>,
}

impl Dispatcher {
    /// Create a dispatcher with custom sinks (for testing)
    pub fn with_sinks(sinks: Vec<Box<dyn EventSink>>) -> Self {
        Self { sinks }
    }

    pub fn sink_names(&self) -> Vec<&str> {
        self.sinks.iter().map(|sink| sink.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Run `op` on every sink; all sinks are visited, the first error wins
    fn for_each_sink(
        &mut self,
        action: &str,
        mut op: impl FnMut(&mut dyn EventSink) -> Result<(), ContractError>,
    ) -> Result<(), ContractError> {
        let mut first_error = None;
        for sink in &mut self.sinks {
            if let Err(e) = op(sink.as_mut()) {
                warn!(sink = sink.name(), action, error = %e, "sink failed");
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl EventSink for Dispatcher {
    fn name(&self) -> &str {
        "dispatcher"
    }

    fn write(&mut self, event: &Event) -> Result<(), ContractError> {
        for sink in &mut self.sinks {
            sink.write(event)?;
        }
        Ok(())
    }

    fn write_batch(&mut self, events: &[Event]) -> Result<(), ContractError> {
        for sink in &mut self.sinks {
            sink.write_batch(events)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), ContractError> {
        for sink in &mut self.sinks {
            sink.flush()?;
        }
        Ok(())
    }

    #[instrument(name = "dispatcher_close", skip(self), fields(sinks = self.sinks.len()))]
    fn close(&mut self) -> Result<(), ContractError> {
        self.for_each_sink("close", |sink| sink.close())?;
        debug!("all sinks closed");
        Ok(())
    }

    #[instrument(name = "dispatcher_discard", skip(self), fields(sinks = self.sinks.len()))]
    fn discard(&mut self) -> Result<(), ContractError> {
        self.for_each_sink("discard", |sink| sink.discard())?;
        info!("scene output discarded");
        Ok(())
    }
}

/// Convenience function to create a dispatcher from sink configs
pub fn create_dispatcher(
    configs: &[SinkConfig],
    target: SceneTarget<'_>,
) -> Result<Dispatcher, DispatcherError> {
    Ok(DispatcherBuilder::new().configured(configs, target)?.build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinks::{MemorySink, SinkState};
    use contracts::MessageSchema;
    use std::collections::HashMap;
    use tempfile::tempdir;

    static SCHEMA: MessageSchema = MessageSchema {
        name: "std_msgs/msg/Empty",
        definition: "",
    };

    struct Broken;

    impl EventSink for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn write(&mut self, _event: &Event) -> Result<(), ContractError> {
            Err(ContractError::sink_write("broken", "disk full"))
        }

        fn flush(&mut self) -> Result<(), ContractError> {
            Ok(())
        }

        fn close(&mut self) -> Result<(), ContractError> {
            Err(ContractError::sink_write("broken", "disk full"))
        }
    }

    #[test]
    fn test_dispatcher_fanout() {
        let first = MemorySink::new("first");
        let second = MemorySink::new("second");
        let (a, b) = (first.recording(), second.recording());
        let mut dispatcher = DispatcherBuilder::new().sink(first).sink(second).build();

        dispatcher
            .write_batch(&[
                Event::new(1, "/a", &SCHEMA, Vec::new()),
                Event::new(2, "/b", &SCHEMA, Vec::new()),
            ])
            .unwrap();
        dispatcher.close().unwrap();

        assert_eq!(a.topic_stamps(), b.topic_stamps());
        assert_eq!(a.len(), 2);
        assert_eq!(b.state(), SinkState::Closed);
    }

    #[test]
    fn test_close_visits_every_sink() {
        let memory = MemorySink::new("memory");
        let recording = memory.recording();
        let mut dispatcher = DispatcherBuilder::new().sink(Broken).sink(memory).build();

        assert!(dispatcher.write(&Event::new(1, "/a", &SCHEMA, Vec::new())).is_err());
        assert!(dispatcher.close().is_err());
        assert_eq!(recording.state(), SinkState::Closed);
    }

    #[test]
    fn test_create_dispatcher_from_config() {
        let dir = tempdir().unwrap();
        let output = OutputConfig {
            dir: dir.path().to_path_buf(),
            ..OutputConfig::default()
        };
        let configs = vec![
            SinkConfig {
                name: "mcap".to_string(),
                sink_type: SinkType::Mcap,
                params: HashMap::new(),
            },
            SinkConfig {
                name: "log".to_string(),
                sink_type: SinkType::Log,
                params: HashMap::new(),
            },
        ];
        let target = SceneTarget {
            output: &output,
            version: "v1.0-mini",
            scene: "scene-0061",
        };

        let mut dispatcher = create_dispatcher(&configs, target).unwrap();
        assert_eq!(dispatcher.sink_names(), vec!["mcap", "log"]);
        dispatcher
            .write(&Event::new(1, "/a", &SCHEMA, Vec::new()))
            .unwrap();
        dispatcher.close().unwrap();
        assert!(dir.path().join("NuScenes-v1.0-mini-scene-0061.mcap").exists());
    }

    #[test]
    fn test_discard_removes_recording() {
        let dir = tempdir().unwrap();
        let output = OutputConfig {
            dir: dir.path().to_path_buf(),
            ..OutputConfig::default()
        };
        let configs = vec![SinkConfig {
            name: "mcap".to_string(),
            sink_type: SinkType::Mcap,
            params: HashMap::new(),
        }];
        let target = SceneTarget {
            output: &output,
            version: "v1.0-mini",
            scene: "scene-0061",
        };

        let mut dispatcher = create_dispatcher(&configs, target).unwrap();
        dispatcher.discard().unwrap();
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }
}
