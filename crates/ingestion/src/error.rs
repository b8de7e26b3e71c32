//! Ingestion 错误类型

use std::path::PathBuf;

use contracts::ContractError;
use thiserror::Error;

/// Ingestion 错误
#[derive(Debug, Error)]
pub enum IngestionError {
    /// 元数据表无法读取或解析
    #[error("failed to read table '{table}' at {path}: {message}")]
    TableRead {
        table: &'static str,
        path: PathBuf,
        message: String,
    },

    /// 点云文件头不是支持的 PCD 布局
    #[error("unsupported pcd header: {message}")]
    PcdHeader { message: String },

    /// 数据长度与声明的布局不一致
    #[error("payload length {actual} does not match expected {expected}")]
    LengthMismatch { expected: usize, actual: usize },

    /// 数据开头不是预期的文件签名
    #[error("invalid {format} signature")]
    Signature { format: &'static str },
}

impl IngestionError {
    pub(crate) fn pcd(message: impl Into<String>) -> Self {
        Self::PcdHeader {
            message: message.into(),
        }
    }

    /// Convert to a record-local decode error
    pub(crate) fn into_decode(self, channel: &str, path: &str) -> ContractError {
        ContractError::payload_decode(channel, path, self.to_string())
    }
}

/// Ingestion Result type alias
pub type Result<T> = std::result::Result<T, IngestionError>;
