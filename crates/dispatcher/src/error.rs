//! Dispatcher error types

use std::path::PathBuf;

use contracts::ContractError;
use thiserror::Error;

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Sink creation error
    #[error("failed to create sink '{name}': {message}")]
    SinkCreation { name: String, message: String },

    /// MCAP writer error
    #[error("mcap error in '{}': {source}", path.display())]
    Mcap {
        path: PathBuf,
        #[source]
        source: mcap::McapError,
    },

    /// Write after close or discard
    #[error("sink '{0}' is already finished")]
    Finished(String),

    /// Sink write error (from contract)
    #[error("sink error: {0}")]
    Contract(#[from] ContractError),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl DispatcherError {
    /// Create a sink creation error
    pub fn sink_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkCreation {
            name: name.into(),
            message: message.into(),
        }
    }

    pub(crate) fn mcap(path: impl Into<PathBuf>, source: mcap::McapError) -> Self {
        Self::Mcap {
            path: path.into(),
            source,
        }
    }

    /// Map onto the contract error of sink `sink_name`
    pub fn into_contract(self, sink_name: &str) -> ContractError {
        match self {
            Self::Contract(e) => e,
            Self::SinkCreation { name, message } => ContractError::sink_open(name, message),
            other => ContractError::sink_write(sink_name, other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::ErrorClass;

    #[test]
    fn test_into_contract_keeps_sink_class() {
        let err = DispatcherError::Finished("mcap".into()).into_contract("mcap");
        assert_eq!(err.class(), ErrorClass::Sink);

        let err = DispatcherError::sink_creation("mcap", "read-only").into_contract("mcap");
        assert!(matches!(err, ContractError::SinkOpen { .. }));

        let err = DispatcherError::from(ContractError::Cancelled).into_contract("mcap");
        assert!(matches!(err, ContractError::Cancelled));
    }
}
