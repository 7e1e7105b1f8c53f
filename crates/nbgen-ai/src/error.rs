//! Error types for nbgen-ai

use thiserror::Error;

/// Result type alias using nbgen-ai Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when talking to a completion endpoint
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed before a response was received
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// No credential was configured for the endpoint
    #[error("No API key configured (set OPENROUTER_API_KEY or api_key in the config file)")]
    AuthenticationMissing,

    /// The endpoint answered with a non-success status
    #[error("Completion request failed with status {status}: {body}")]
    TransportFailure { status: u16, body: String },

    /// The response envelope did not have the expected shape
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Create a transport failure from a status code and raw body
    pub fn transport(status: u16, body: impl Into<String>) -> Self {
        Self::TransportFailure {
            status,
            body: body.into(),
        }
    }

    /// Raw response body, if the error carries one
    pub fn response_body(&self) -> Option<&str> {
        match self {
            Error::TransportFailure { body, .. } => Some(body),
            Error::UnexpectedResponse(body) => Some(body),
            _ => None,
        }
    }

    /// Check if this error indicates the credential was rejected or absent
    pub fn is_auth_error(&self) -> bool {
        match self {
            Error::AuthenticationMissing => true,
            Error::TransportFailure { status, .. } => *status == 401 || *status == 403,
            _ => false,
        }
    }
}
