//! Error type for the HTTP client

use erp_views_core::ApiError;
use thiserror::Error;

/// Error type for client operations
#[derive(Error, Debug)]
pub enum ClientError {
    /// Network error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("Server error ({status}): {message}")]
    Server {
        /// HTTP status code
        status: u16,
        /// Response body
        message: String,
    },

    /// Addressed entity does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Settings could not be loaded
    #[error("Settings error: {0}")]
    Settings(#[from] config::ConfigError),

    /// Other error
    #[error("Other error: {0}")]
    Other(String),
}

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

impl From<ClientError> for ApiError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Network(e) if e.is_decode() => ApiError::Decode(e.to_string()),
            ClientError::Network(e) => ApiError::Network(e.to_string()),
            ClientError::Server { status, message } => ApiError::Server { status, message },
            ClientError::NotFound(what) => ApiError::NotFound(what),
            ClientError::Json(e) => ApiError::Decode(e.to_string()),
            ClientError::Settings(e) => ApiError::Other(e.to_string()),
            ClientError::Other(msg) => ApiError::Other(msg),
        }
    }
}
