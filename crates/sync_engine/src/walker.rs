//! Keyframe walker: non-keyframe records between two keyframes

use contracts::{
    sort_batch, ContractError, DatasetReader, Event, Sample, SampleData, SensorModality,
    Timestamped, Token,
};
use tracing::debug;

use crate::sensor::SensorEvents;

/// One channel's record chain loaded into an index arena
///
/// Records are in chain order, which is strictly increasing time.
#[derive(Debug, Clone, Default)]
pub struct ChannelChain {
    tokens: Vec<Token>,
    stamps: Vec<u64>,
}

impl ChannelChain {
    /// Load the whole chain that contains `anchor`
    ///
    /// # Errors
    /// Missing records, or links that are not strictly time-ordered.
    pub fn load(dataset: &dyn DatasetReader, anchor: &SampleData) -> Result<Self, ContractError> {
        let mut head = anchor;
        while let Some(prev_token) = head.prev.as_deref() {
            let prev = dataset.sample_data(prev_token)?;
            check_link(head, prev, false)?;
            head = prev;
        }

        let mut chain = Self::default();
        let mut cursor = Some(head);
        while let Some(record) = cursor {
            chain.tokens.push(record.token.clone());
            chain.stamps.push(record.timestamp_ns());
            cursor = match record.next.as_deref() {
                Some(token) => {
                    let next = dataset.sample_data(token)?;
                    check_link(record, next, true)?;
                    Some(next)
                }
                None => None,
            };
        }
        debug!(channel = %anchor.channel, records = chain.len(), "channel chain loaded");
        Ok(chain)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn token(&self, index: usize) -> Option<&str> {
        self.tokens.get(index).map(String::as_str)
    }

    /// Index of the record closest in time to `stamp_ns`; ties go to the
    /// earlier record
    pub fn nearest(&self, stamp_ns: u64) -> Option<usize> {
        let after = self.stamps.partition_point(|&t| t < stamp_ns);
        let before = after.checked_sub(1);
        match (before, self.stamps.get(after)) {
            (Some(b), Some(&t_after)) => {
                if t_after - stamp_ns < stamp_ns - self.stamps[b] {
                    Some(after)
                } else {
                    Some(b)
                }
            }
            (Some(b), None) => Some(b),
            (None, Some(_)) => Some(after),
            (None, None) => None,
        }
    }
}

/// `next` must stay on the channel and move forward in time (`prev` backward)
fn check_link(from: &SampleData, to: &SampleData, forward: bool) -> Result<(), ContractError> {
    let ordered = if forward {
        to.timestamp > from.timestamp
    } else {
        to.timestamp < from.timestamp
    };
    if to.channel != from.channel || !ordered {
        return Err(ContractError::malformed_link(
            "sample_data",
            &from.token,
            format!(
                "{} link to '{}' ({} @ {}) breaks the {} chain",
                if forward { "next" } else { "prev" },
                to.token,
                to.channel,
                to.timestamp,
                from.channel
            ),
        ));
    }
    Ok(())
}

/// Walks every channel of a keyframe up to the next keyframe
pub struct KeyframeWalker<'a> {
    dataset: &'a dyn DatasetReader,
    lidar: Option<ChannelChain>,
}

impl<'a> KeyframeWalker<'a> {
    /// `lidar` is the chain used for camera overlays; without it overlays
    /// are omitted
    pub fn new(dataset: &'a dyn DatasetReader, lidar: Option<ChannelChain>) -> Self {
        Self { dataset, lidar }
    }

    /// Non-keyframe records following each keyframe record, channel by
    /// channel
    pub fn non_keyframes(&self, sample: &Sample) -> Result<Vec<&'a SampleData>, ContractError> {
        let dataset = self.dataset;
        let mut records = Vec::new();
        for token in sample.data.values() {
            let mut current = dataset.sample_data(token)?;
            while let Some(next_token) = current.next.as_deref() {
                let next = dataset.sample_data(next_token)?;
                check_link(current, next, true)?;
                if next.is_key_frame {
                    break;
                }
                records.push(next);
                current = next;
            }
        }
        Ok(records)
    }

    /// Lidar record closest to `stamp_ns`
    pub fn nearest_lidar(&self, stamp_ns: u64) -> Result<Option<&'a SampleData>, ContractError> {
        let dataset = self.dataset;
        let Some(chain) = &self.lidar else {
            return Ok(None);
        };
        chain
            .nearest(stamp_ns)
            .and_then(|i| chain.token(i))
            .map(|token| dataset.sample_data(token))
            .transpose()
    }

    /// Events of every non-keyframe record at its own timestamp, sorted
    pub fn walk(
        &self,
        sample: &Sample,
        sensors: &mut SensorEvents<'_>,
    ) -> Result<Vec<Event>, ContractError> {
        let mut batch = Vec::new();
        for record in self.non_keyframes(sample)? {
            let stamp = record.timestamp_ns();
            let overlay = match record.modality {
                SensorModality::Camera => self.nearest_lidar(stamp)?,
                SensorModality::Lidar | SensorModality::Radar => None,
            };
            batch.extend(sensors.record_events(record, stamp, overlay)?);
        }
        sort_batch(&mut batch);
        Ok(batch)
    }
}
