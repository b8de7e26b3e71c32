//! EventSink trait - Dispatcher output interface
//!
//! Append-only writer of `(topic, payload, timestamp_ns)`. Sinks impose no
//! ordering: events are written in the order they arrive.

use crate::{ContractError, Event};

/// Event output trait
///
/// A sink lives for one scene. `close` finalizes the output, `discard`
/// drops whatever was written so far; exactly one of them ends the sink.
pub trait EventSink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Write one event
    ///
    /// # Errors
    /// Returns write error (should include context)
    fn write(&mut self, event: &Event) -> Result<(), ContractError>;

    /// Write a batch in order
    fn write_batch(&mut self, events: &[Event]) -> Result<(), ContractError> {
        for event in events {
            self.write(event)?;
        }
        Ok(())
    }

    /// Flush buffer (if any)
    fn flush(&mut self) -> Result<(), ContractError>;

    /// Finalize the output
    fn close(&mut self) -> Result<(), ContractError>;

    /// Drop partial output
    fn discard(&mut self) -> Result<(), ContractError> {
        Ok(())
    }
}

impl<S: EventSink + ?Sized> EventSink for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn write(&mut self, event: &Event) -> Result<(), ContractError> {
        (**self).write(event)
    }

    fn write_batch(&mut self, events: &[Event]) -> Result<(), ContractError> {
        (**self).write_batch(events)
    }

    fn flush(&mut self) -> Result<(), ContractError> {
        (**self).flush()
    }

    fn close(&mut self) -> Result<(), ContractError> {
        (**self).close()
    }

    fn discard(&mut self) -> Result<(), ContractError> {
        (**self).discard()
    }
}
