use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Embedding failed for {item}: {reason}")]
    EmbeddingFailure { item: String, reason: String },

    #[error("Storage failure: {0}")]
    StorageFailure(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification reported back to callers of batch operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    EmbeddingFailure,
    StorageFailure,
    InvalidConfig,
}

impl Error {
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound(key.into())
    }

    pub fn embedding(item: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::EmbeddingFailure { item: item.into(), reason: reason.into() }
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::StorageFailure(msg.into())
    }

    pub fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        Self::Io { path: path.as_ref().display().to_string(), source }
    }

    /// I/O and (de)serialization problems are durable-storage failures from
    /// the caller's point of view.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidConfig(_) => ErrorKind::InvalidConfig,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::EmbeddingFailure { .. } => ErrorKind::EmbeddingFailure,
            Error::StorageFailure(_) | Error::Io { .. } | Error::Serialization(_) => ErrorKind::StorageFailure,
        }
    }
}
