use thiserror::Error;

use super::types::EntryId;

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("File size exceeds {limit} byte limit (got {size})")]
    TooLarge { size: u64, limit: u64 },

    #[error("File type not supported: {0}")]
    UnsupportedType(String),

    #[error("Upload failed: {0}")]
    TransferFailed(String),

    #[error("Upload was cancelled")]
    Cancelled,

    #[error("Entry not found: {0}")]
    EntryNotFound(EntryId),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl UploadError {
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

/// Error alias
pub type Result<T, E = UploadError> = std::result::Result<T, E>;
