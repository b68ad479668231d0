//! Error types for provider calls.

/// Result type alias for provider operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Provider transport errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider answered with a non-success status.
    #[error("Provider rejected request with status {status}: {body}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Response body returned by the provider.
        body: String,
    },
}
