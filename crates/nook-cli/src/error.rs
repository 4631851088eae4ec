use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] nook_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Collection name cannot be empty")]
    EmptyCollection,
    #[error("Record ID cannot be empty")]
    EmptyRecordId,
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Sync failed: {0}")]
    SyncFailed(String),
    #[error(
        "Sync is not configured. Set NOOK_FIRESTORE_PROJECT_ID and NOOK_ID_TOKEN, or add them to cli-config.json."
    )]
    SyncNotConfigured,
}
