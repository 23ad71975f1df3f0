use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] tracker_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Item ID cannot be empty")]
    EmptyItemId,
    #[error("Invalid value for {field}: {message}")]
    InvalidArgument { field: &'static str, message: String },
    #[error("Sync is not configured. Run `tracker config set --url <APPS_SCRIPT_URL>` first.")]
    SyncNotConfigured,
}

impl CliError {
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field,
            message: message.into(),
        }
    }
}
