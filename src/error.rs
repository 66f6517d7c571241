//! Error types for sensorvault.

use std::path::PathBuf;

/// Result type for sensorvault operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in sensorvault.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Database error from SQLite.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Failed to create database directory.
    #[error("Failed to create database directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    /// IV has the wrong length.
    #[error("Invalid IV length: expected {expected} bytes, got {actual}")]
    InvalidIv { expected: usize, actual: usize },

    /// Decryption failed (wrong key, truncated or corrupt ciphertext).
    #[error("Decryption failed: wrong key or corrupt ciphertext")]
    Decrypt,

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the error is transient and worth retrying.
    ///
    /// Storage-level failures (a busy or locked database, IO hiccups) may
    /// succeed on a later attempt. Crypto and serialization failures are
    /// deterministic and never retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Database(_) | Error::Io(_))
    }
}
