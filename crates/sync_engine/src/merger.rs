//! Multi-stream merger over the bus cursors

use contracts::{sort_batch, BusMessage, CanBusReader, ContractError, Event, Timestamped, Topic};
use tracing::{debug, instrument};

use crate::bus::BUS_CHANNELS;
use crate::cursor::StreamCursor;

/// One cursor per auxiliary channel, advanced together
#[derive(Debug)]
pub struct MultiStreamMerger<R> {
    cursors: Vec<StreamCursor<R>>,
}

impl<R> Default for MultiStreamMerger<R> {
    fn default() -> Self {
        Self {
            cursors: Vec::new(),
        }
    }
}

impl<R: Timestamped> MultiStreamMerger<R> {
    pub fn new(cursors: Vec<StreamCursor<R>>) -> Self {
        Self { cursors }
    }

    /// Advance every cursor to `target_ns`
    ///
    /// Events are concatenated in cursor order, then stable-sorted, so equal
    /// timestamps keep the table order.
    pub fn advance_to(&mut self, target_ns: u64) -> Result<Vec<Event>, ContractError> {
        let mut batch = Vec::new();
        for cursor in &mut self.cursors {
            let events = cursor.advance_to(target_ns)?;
            observability::record_bus_messages(cursor.channel(), events.len());
            batch.extend(events);
        }
        sort_batch(&mut batch);
        Ok(batch)
    }

    pub fn cursors(&self) -> &[StreamCursor<R>] {
        &self.cursors
    }

    /// Records skipped over all cursors
    pub fn failures(&self) -> u64 {
        self.cursors.iter().map(StreamCursor::failures).sum()
    }
}

impl MultiStreamMerger<BusMessage> {
    /// Fresh cursors over the scene's bus groups
    ///
    /// # Errors
    /// `ContractError::BusRead` when a group exists but cannot be read.
    #[instrument(name = "merger_for_scene", skip(reader))]
    pub fn for_scene(reader: &dyn CanBusReader, scene_name: &str) -> Result<Self, ContractError> {
        let mut cursors = Vec::with_capacity(BUS_CHANNELS.len());
        for channel in &BUS_CHANNELS {
            let messages = reader.messages(scene_name, channel.group)?;
            debug!(group = channel.group, messages = messages.len(), "bus group loaded");
            cursors.push(StreamCursor::new(
                channel.group,
                Topic::new(channel.topic),
                messages,
                channel.decode,
            ));
        }
        Ok(Self::new(cursors))
    }
}
