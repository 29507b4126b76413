//! Error types for vitaltrend

use thiserror::Error;

/// Errors that can occur during computation
///
/// Insufficient history is never an error; operations that need more data
/// return an empty result instead.
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Failed to parse sample payload: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Date parse error: {0}")]
    DateParseError(String),

    #[error("Invalid engine configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown metric: {0}")]
    UnknownMetric(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),
}
