//! Error types for CLI operations.

use contracts::ContractError;
use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Configuration failed to load or validate
    #[error("Invalid configuration: {0}")]
    Config(#[source] ContractError),

    /// A dataset version could not be opened
    #[error("Failed to open dataset version '{version}': {source}")]
    DatasetOpen {
        version: String,
        #[source]
        source: ContractError,
    },

    /// Conversion stopped by the operator
    #[error("Conversion cancelled")]
    Cancelled,

    /// Worker thread failed
    #[error("Conversion worker failed: {message}")]
    Worker { message: String },
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn dataset_open(version: impl Into<String>, source: ContractError) -> Self {
        Self::DatasetOpen {
            version: version.into(),
            source,
        }
    }

    pub fn worker(message: impl Into<String>) -> Self {
        Self::Worker {
            message: message.into(),
        }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
