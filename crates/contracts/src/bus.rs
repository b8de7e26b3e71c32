//! CAN bus messages and the bus reader contract

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{micros_to_nanos, ContractError, Timestamped};

/// One signal value
///
/// Bus groups mix scalars, fixed-size vectors and occasional flags/strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BusValue {
    Flag(bool),
    Scalar(f64),
    Vector(Vec<f64>),
    Text(String),
}

impl BusValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Scalar(v) => Some(*v),
            Self::Flag(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    pub fn as_slice(&self) -> Option<&[f64]> {
        match self {
            Self::Vector(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    /// Text rendering used for key/value diagnostics
    pub fn render(&self) -> String {
        match self {
            Self::Flag(b) => b.to_string(),
            Self::Scalar(v) => v.to_string(),
            Self::Vector(v) => format!("{v:?}"),
            Self::Text(s) => s.clone(),
        }
    }
}

/// One bus message: `utime` (microseconds) plus named signals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusMessage {
    pub utime: u64,
    #[serde(flatten)]
    pub signals: BTreeMap<String, BusValue>,
}

impl BusMessage {
    pub fn new(utime: u64) -> Self {
        Self {
            utime,
            signals: BTreeMap::new(),
        }
    }

    /// Builder-style signal insert
    pub fn with(mut self, name: &str, value: BusValue) -> Self {
        self.signals.insert(name.to_string(), value);
        self
    }

    pub fn signal(&self, name: &str) -> Option<&BusValue> {
        self.signals.get(name)
    }
}

impl Timestamped for BusMessage {
    fn timestamp_ns(&self) -> u64 {
        micros_to_nanos(self.utime)
    }
}

/// CAN bus reader
pub trait CanBusReader {
    /// Messages of one group for one scene, sorted by `utime`.
    ///
    /// A scene without data for the group yields an empty vector.
    fn messages(&self, scene_name: &str, group: &str) -> Result<Vec<BusMessage>, ContractError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bus_message_json_shape() {
        let raw = r#"{"utime": 1532402927814384, "linear_accel": [0.1, 0.2, 9.8], "value": 3.5, "brake_switch": 1}"#;
        let msg: BusMessage = serde_json::from_str(raw).unwrap();
        assert_eq!(msg.utime, 1_532_402_927_814_384);
        assert_eq!(
            msg.signal("linear_accel").and_then(BusValue::as_slice),
            Some(&[0.1, 0.2, 9.8][..])
        );
        assert_eq!(msg.signal("value").and_then(BusValue::as_f64), Some(3.5));
        assert_eq!(msg.timestamp_ns(), 1_532_402_927_814_384_000);
    }

    #[test]
    fn test_render() {
        assert_eq!(BusValue::Scalar(2.5).render(), "2.5");
        assert_eq!(BusValue::Flag(true).render(), "true");
    }
}
