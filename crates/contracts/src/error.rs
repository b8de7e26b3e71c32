//! Layered error definitions
//!
//! Categorized by source: config / dataset / decode / sink / cancel.
//! [`ErrorClass`] tells callers how far an error is allowed to propagate.

use thiserror::Error;

/// How far an error propagates before it is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Unreadable dataset root, unknown version, bad config file. Fatal to the run.
    Configuration,
    /// Missing token, malformed link, unreadable scene context. Fatal to the scene.
    DatasetIntegrity,
    /// Missing or corrupt payload file. Fatal to one record only.
    PayloadDecode,
    /// Output write failure. Fatal to the scene, partial output is discarded.
    Sink,
    /// Operator requested shutdown.
    Cancelled,
    /// Anything else; treated like a scene failure.
    Other,
}

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    /// Dataset root or version cannot be opened
    #[error("cannot open dataset '{version}' at {root}: {message}")]
    DatasetOpen {
        root: String,
        version: String,
        message: String,
    },

    // ===== Dataset Integrity Errors =====
    /// Token not present in its table
    #[error("missing record in table '{table}': token '{token}'")]
    MissingRecord { table: &'static str, token: String },

    /// Link field points somewhere it must not (cycle, wrong scene, wrong channel)
    #[error("malformed link in table '{table}' at '{token}': {message}")]
    MalformedLink {
        table: &'static str,
        token: String,
        message: String,
    },

    /// CAN bus stream cannot be read
    #[error("can bus group '{group}' for scene '{scene}' unreadable: {message}")]
    BusRead {
        scene: String,
        group: String,
        message: String,
    },

    /// Map layers cannot be loaded for a location
    #[error("map '{location}' unavailable: {message}")]
    MapLoad { location: String, message: String },

    // ===== Decode Errors =====
    /// Sensor payload cannot be decoded
    #[error("payload decode error for channel '{channel}' ({path}): {message}")]
    PayloadDecode {
        channel: String,
        path: String,
        message: String,
    },

    /// Message cannot be encoded for the output container
    #[error("cannot encode message for topic '{topic}': {message}")]
    Encode { topic: String, message: String },

    // ===== Sink Errors =====
    /// Sink cannot be opened
    #[error("sink '{sink_name}' open error: {message}")]
    SinkOpen { sink_name: String, message: String },

    /// Sink write error
    #[error("sink '{sink_name}' write error: {message}")]
    SinkWrite { sink_name: String, message: String },

    // ===== Control =====
    /// Conversion was cancelled by the operator
    #[error("conversion cancelled")]
    Cancelled,

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create missing record error
    pub fn missing(table: &'static str, token: impl Into<String>) -> Self {
        Self::MissingRecord {
            table,
            token: token.into(),
        }
    }

    /// Create malformed link error
    pub fn malformed_link(
        table: &'static str,
        token: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::MalformedLink {
            table,
            token: token.into(),
            message: message.into(),
        }
    }

    /// Create payload decode error
    pub fn payload_decode(
        channel: impl Into<String>,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::PayloadDecode {
            channel: channel.into(),
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create message encode error
    pub fn encode(topic: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Encode {
            topic: topic.into(),
            message: message.into(),
        }
    }

    /// Create sink write error
    pub fn sink_write(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkWrite {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }

    /// Create sink open error
    pub fn sink_open(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkOpen {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }

    /// Error class used by the batch runner to pick a recovery scope
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::ConfigParse { .. } | Self::ConfigValidation { .. } | Self::DatasetOpen { .. } => {
                ErrorClass::Configuration
            }
            Self::MissingRecord { .. }
            | Self::MalformedLink { .. }
            | Self::BusRead { .. }
            | Self::MapLoad { .. } => ErrorClass::DatasetIntegrity,
            Self::PayloadDecode { .. } | Self::Encode { .. } => ErrorClass::PayloadDecode,
            Self::SinkOpen { .. } | Self::SinkWrite { .. } | Self::Io(_) => ErrorClass::Sink,
            Self::Cancelled => ErrorClass::Cancelled,
            Self::Other(_) => ErrorClass::Other,
        }
    }

    /// Whether the error only affects a single record
    pub fn is_record_local(&self) -> bool {
        self.class() == ErrorClass::PayloadDecode
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classes() {
        assert_eq!(
            ContractError::missing("sample", "abc").class(),
            ErrorClass::DatasetIntegrity
        );
        assert_eq!(
            ContractError::payload_decode("CAM_FRONT", "a.jpg", "truncated").class(),
            ErrorClass::PayloadDecode
        );
        assert_eq!(
            ContractError::sink_write("mcap", "disk full").class(),
            ErrorClass::Sink
        );
        assert_eq!(
            ContractError::config_validation("dataset.versions", "empty").class(),
            ErrorClass::Configuration
        );
        assert!(ContractError::payload_decode("RADAR_FRONT", "x.pcd", "bad").is_record_local());
        assert!(!ContractError::Cancelled.is_record_local());
    }

    #[test]
    fn test_display_names_table_and_token() {
        let err = ContractError::missing("sample_data", "tok42");
        let text = err.to_string();
        assert!(text.contains("sample_data"), "got: {text}");
        assert!(text.contains("tok42"), "got: {text}");
    }
}
