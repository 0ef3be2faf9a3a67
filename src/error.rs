//! Error types for bodymetrics
//!
//! The metrics engine itself never fails: missing or invalid inputs surface as
//! absent output fields. These errors only exist at the JSON and configuration
//! boundary.

use thiserror::Error;

/// Errors that can occur at the request/report boundary
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Failed to parse request: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] crate::schema::ValidationError),

    #[error("Invalid engine configuration: {0}")]
    InvalidConfig(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),
}
