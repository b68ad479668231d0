//! Error types for the core library.

use thiserror::Error;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Credential encryption or decryption failed.
    #[error("Credential error: {0}")]
    Vault(#[from] crate::vault::VaultError),

    /// Send routing failed.
    #[error("Routing error: {0}")]
    Routing(#[from] crate::router::RouterError),

    /// Sender not found (or soft-deleted).
    #[error("Sender not found: {0}")]
    SenderNotFound(String),

    /// Message fields are inconsistent with its kind.
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// Stored value could not be interpreted.
    #[error("Corrupt record: {0}")]
    CorruptRecord(String),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
