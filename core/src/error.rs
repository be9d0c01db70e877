//! Error types for the core crate
//!
//! [`ApiError`] is what the external CRUD API reports, independent of the
//! transport. [`EngineError`] is what the view engine surfaces: read-path
//! variants are degraded to an empty-but-valid state and reported, write-path
//! variants always propagate to the caller.

use std::io;

use thiserror::Error;

use crate::batch::BatchOutcome;
use crate::models::RecordId;

/// Error reported by the external CRUD API
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    /// Request never got a response
    #[error("Network error: {0}")]
    Network(String),

    /// Backend answered with a non-success status
    #[error("Server error ({status}): {message}")]
    Server {
        /// HTTP status code
        status: u16,
        /// Response body or reason
        message: String,
    },

    /// Addressed entity does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Response body could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// Other error
    #[error("API error: {0}")]
    Other(String),
}

/// Result type of external API calls
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Error surfaced by the view engine
#[derive(Error, Debug)]
pub enum EngineError {
    /// Table structure could not be fetched
    #[error("Schema load error: {0}")]
    SchemaLoad(ApiError),

    /// Record page could not be fetched
    #[error("Record load error: {0}")]
    RecordLoad(ApiError),

    /// Foreign table could not be fetched; raw ids are kept
    #[error("Foreign key resolution error on column '{column}': {source}")]
    ForeignResolution {
        /// Foreign key column
        column: String,
        /// Underlying API error
        source: ApiError,
    },

    /// View, view column or sort configuration could not be loaded
    #[error("View configuration error: {0}")]
    ViewConfig(String),

    /// A write was rejected; local state is untouched
    #[error("{operation} failed: {source}")]
    Mutation {
        /// Operation that failed
        operation: String,
        /// Underlying API error
        source: ApiError,
    },

    /// Sequential record reorder stopped at a failing record
    #[error("Reorder stopped at record {failed_record}: {reason}")]
    PartialReorder {
        /// Record whose position update failed
        failed_record: RecordId,
        /// Underlying API error
        reason: ApiError,
        /// Per-record result of the batch
        outcome: BatchOutcome,
    },

    /// Value rejected by edit-time validation
    #[error("Validation error: {0}")]
    Validation(String),

    /// Operation not allowed in the current state
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Data needed by the operation has not been loaded yet
    #[error("Not loaded: {0}")]
    NotLoaded(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EngineError {
    /// Whether the error comes from a read path and was degraded to a default state
    pub fn is_degraded_read(&self) -> bool {
        matches!(
            self,
            EngineError::SchemaLoad(_)
                | EngineError::RecordLoad(_)
                | EngineError::ForeignResolution { .. }
                | EngineError::ViewConfig(_)
        )
    }
}

/// Result type for the core crate
pub type Result<T> = std::result::Result<T, EngineError>;

/// Wrap an API error as a failed mutation named `operation`
pub fn to_mutation_error(operation: &str) -> impl FnOnce(ApiError) -> EngineError + '_ {
    move |source| EngineError::Mutation {
        operation: operation.to_string(),
        source,
    }
}

/// Convert an error into a ViewConfig error
pub fn to_view_config_error<E: std::fmt::Display>(err: E) -> EngineError {
    EngineError::ViewConfig(err.to_string())
}
