//! MemorySink - keeps events in memory for tests and dry runs

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use contracts::{ContractError, Event, EventSink};

/// How a sink ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SinkState {
    #[default]
    Open,
    Closed,
    Discarded,
}

#[derive(Debug, Default)]
struct Recorded {
    events: Vec<Event>,
    state: SinkState,
}

/// Shared view of what a [`MemorySink`] received
///
/// Stays readable after the sink itself was moved into a dispatcher.
#[derive(Debug, Clone, Default)]
pub struct MemoryRecording(Arc<Mutex<Recorded>>);

impl MemoryRecording {
    fn lock(&self) -> MutexGuard<'_, Recorded> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn events(&self) -> Vec<Event> {
        self.lock().events.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().events.is_empty()
    }

    /// `(topic, timestamp_ns)` in write order
    pub fn topic_stamps(&self) -> Vec<(String, u64)> {
        self.lock()
            .events
            .iter()
            .map(|e| (e.topic.to_string(), e.timestamp_ns))
            .collect()
    }

    pub fn state(&self) -> SinkState {
        self.lock().state
    }
}

/// Sink collecting events in memory
pub struct MemorySink {
    name: String,
    recording: MemoryRecording,
}

impl MemorySink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            recording: MemoryRecording::default(),
        }
    }

    pub fn recording(&self) -> MemoryRecording {
        self.recording.clone()
    }

    fn ensure_open(&self, recorded: &Recorded) -> Result<(), ContractError> {
        match recorded.state {
            SinkState::Open => Ok(()),
            state => Err(ContractError::sink_write(
                &self.name,
                format!("sink is {state:?}"),
            )),
        }
    }
}

impl EventSink for MemorySink {
    fn name(&self) -> &str {
        &self.name
    }

    fn write(&mut self, event: &Event) -> Result<(), ContractError> {
        let mut recorded = self.recording.lock();
        self.ensure_open(&recorded)?;
        recorded.events.push(event.clone());
        Ok(())
    }

    fn write_batch(&mut self, events: &[Event]) -> Result<(), ContractError> {
        let mut recorded = self.recording.lock();
        self.ensure_open(&recorded)?;
        recorded.events.extend_from_slice(events);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    fn close(&mut self) -> Result<(), ContractError> {
        let mut recorded = self.recording.lock();
        self.ensure_open(&recorded)?;
        recorded.state = SinkState::Closed;
        Ok(())
    }

    fn discard(&mut self) -> Result<(), ContractError> {
        let mut recorded = self.recording.lock();
        recorded.events.clear();
        recorded.state = SinkState::Discarded;
        Ok(())
    }
}
