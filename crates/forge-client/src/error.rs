//! Client error types.

use thiserror::Error;

/// Client error type.
#[derive(Debug, Error)]
pub enum Error {
    /// No credentials in the session and nothing to refresh with.
    #[error("Not authenticated")]
    NotAuthenticated,

    /// The refresh token was rejected or the backend kept rejecting the
    /// access token. The session's credentials have been cleared.
    #[error("Authentication expired, log in again")]
    AuthenticationExpired,

    /// Backend answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Message extracted from the response body.
        message: String,
        /// Response body (JSON if it parsed, otherwise the raw text).
        body: serde_json::Value,
    },

    /// Network-level failure (connection, timeout, TLS).
    #[error("Transport error: {0}")]
    Transport(String),

    /// A success response whose body could not be understood.
    #[error("Invalid response ({status}): {message}")]
    InvalidResponse {
        /// HTTP status code.
        status: u16,
        /// What was wrong with the body.
        message: String,
    },

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing failed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Session backing store failed.
    #[error("Session error: {0}")]
    Session(#[from] forge_session::Error),
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Transport(e.to_string())
    }
}

impl Error {
    /// Whether the caller should send the user back through login.
    pub fn requires_login(&self) -> bool {
        matches!(self, Error::NotAuthenticated | Error::AuthenticationExpired)
    }

    /// Whether this is a network-level failure.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_))
    }

    /// Whether another attempt could succeed without any state change.
    pub(crate) fn is_retryable(&self) -> bool {
        self.is_transport()
    }

    /// HTTP status attached to this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } | Error::InvalidResponse { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Check if this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Check if this is an authorization-policy rejection.
    pub fn is_forbidden(&self) -> bool {
        self.status() == Some(403)
    }

    /// Message suitable for showing to an end user.
    pub fn user_message(&self) -> String {
        match self {
            Error::NotAuthenticated | Error::AuthenticationExpired => {
                "Your session has expired. Please log in again.".to_string()
            }
            Error::Api { message, .. } => message.clone(),
            Error::Transport(_) => {
                "Could not reach the server. Check your connection and try again.".to_string()
            }
            other => other.to_string(),
        }
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;
