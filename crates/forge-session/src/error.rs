//! Error types for session credential storage.

/// Error type for session storage operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Reading or writing the session backing store failed.
    #[error("Session storage error: {0}")]
    Storage(String),

    /// A stored session value could not be encoded or decoded.
    #[error("Session serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Attempted to store a record with an empty access or refresh token.
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Storage(e.to_string())
    }
}

/// Result type for session storage operations.
pub type Result<T> = std::result::Result<T, Error>;
