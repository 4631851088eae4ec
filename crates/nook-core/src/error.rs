//! Error types for nook-core

use thiserror::Error;

/// Result type alias using nook-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in nook-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// No principal was signed in when a remote operation was requested
    #[error("User not authenticated")]
    Unauthenticated,

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// HTTP transport error talking to the remote store
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Remote store rejected or failed a request
    #[error("Remote store error: {0}")]
    Remote(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Record not found
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A value the remote wire format cannot carry reached an encoder
    #[error("Unrepresentable value: {0}")]
    Unrepresentable(String),
}
