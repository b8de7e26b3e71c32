//! Stream cursor: one time-ordered channel plus a read position.

use contracts::{ContractError, Event, Timestamped, Topic};
use tracing::{trace, warn};

/// Record decoder: one record to one event on `topic`
pub type Decoder<R> = fn(&R, &Topic) -> Result<Event, ContractError>;

/// Scan position into one time-ordered channel
///
/// After `advance_to(t)` with `index > 0`:
/// `records[index - 1] < t <= records[index]` (right side while records
/// remain). The index never moves backwards, so every record is decoded at
/// most once.
#[derive(Debug)]
pub struct StreamCursor<R> {
    channel: String,
    topic: Topic,
    records: Vec<R>,
    index: usize,
    decode: Decoder<R>,
    failures: u64,
}

impl<R: Timestamped> StreamCursor<R> {
    /// `records` must already be sorted by time
    pub fn new(channel: &str, topic: Topic, records: Vec<R>, decode: Decoder<R>) -> Self {
        Self {
            channel: channel.to_string(),
            topic,
            records,
            index: 0,
            decode,
            failures: 0,
        }
    }

    /// Decode every unconsumed record strictly before `target_ns`
    ///
    /// A record that fails to decode is logged, counted and skipped; the
    /// cursor moves past it either way. Errors that are not record-local
    /// stop the advance and are returned.
    pub fn advance_to(&mut self, target_ns: u64) -> Result<Vec<Event>, ContractError> {
        let mut events = Vec::new();

        while let Some(record) = self.records.get(self.index) {
            if record.timestamp_ns() >= target_ns {
                break;
            }
            self.index += 1;

            match (self.decode)(record, &self.topic) {
                Ok(event) => events.push(event),
                Err(e) if e.is_record_local() => {
                    self.failures += 1;
                    warn!(
                        channel = %self.channel,
                        index = self.index - 1,
                        error = %e,
                        "record skipped"
                    );
                    observability::record_decode_failure(&self.channel);
                }
                Err(e) => return Err(e),
            }
        }

        trace!(
            channel = %self.channel,
            target_ns,
            index = self.index,
            emitted = events.len(),
            "cursor advanced"
        );
        Ok(events)
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    /// Records consumed so far
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records not yet consumed
    pub fn remaining(&self) -> usize {
        self.records.len() - self.index
    }

    /// Records skipped for decode errors
    pub fn failures(&self) -> u64 {
        self.failures
    }
}
