//! Error types for tracker-core

use thiserror::Error;

use crate::sync::TransmissionError;

/// Result type alias using tracker-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in tracker-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Key-value persistence failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Item not found
    #[error("Item not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Local write lost to a newer stored copy of the item
    #[error("A newer copy of item {0} is already stored")]
    Conflict(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// No remote endpoint configured for an operation that needs one
    #[error("No Apps Script URL configured")]
    NotConfigured,

    /// Remote endpoint rejected or failed a request
    #[error(transparent)]
    Transmission(#[from] TransmissionError),
}

impl Error {
    /// Whether this error came from talking to the remote endpoint.
    pub const fn is_transmission(&self) -> bool {
        matches!(self, Self::Transmission(_))
    }

    /// Whether this error came from the local persistence layer.
    pub const fn is_storage(&self) -> bool {
        matches!(
            self,
            Self::Storage(_) | Self::LibSql(_) | Self::Io(_) | Self::Serialization(_)
        )
    }
}
