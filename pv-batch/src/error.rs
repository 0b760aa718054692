//! Error types for pv-batch
//!
//! Per-source and per-record errors never abort a batch:
//! - `ExtractionError`: one evidence source unusable (degrades a score)
//! - `SinkError`: persistence failed for one record (attached to its outcome)
//! - `PipelineError`: a single record failed (`Failed` state)
//! - `BatchError`: caller-level problems (bad arguments, unreadable input)

use std::time::Duration;
use thiserror::Error;

/// Evidence extraction error
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// I/O error (document read)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Network communication error
    #[error("Network error: {0}")]
    Network(String),

    /// Remote returned a non-success status
    #[error("HTTP status {0}")]
    Status(u16),

    /// Source did not answer within the per-call timeout
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// Extractor panicked while producing evidence
    #[error("Extractor panicked: {0}")]
    Panicked(String),

    /// Source not available for this record
    #[error("Not available: {0}")]
    NotAvailable(String),
}

impl From<reqwest::Error> for ExtractionError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ExtractionError::Network(format!("request timed out: {}", err))
        } else if let Some(status) = err.status() {
            ExtractionError::Status(status.as_u16())
        } else {
            ExtractionError::Network(err.to_string())
        }
    }
}

/// Persistence error
#[derive(Debug, Error)]
pub enum SinkError {
    /// Database operation error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Database stayed locked past the retry budget
    #[error("Database locked: {0}")]
    Locked(String),

    /// Profile or evidence could not be serialized
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Write did not finish within the sink timeout
    #[error("Sink write timed out after {0:?}")]
    Timeout(Duration),

    /// Downstream consumer is gone
    #[error("Channel closed: {0}")]
    Closed(String),
}

/// Failure of a single record
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Input a stage cannot score
    #[error("Validation failure: {0}")]
    ValidationFailure(String),

    #[error("Sink failure: {0}")]
    Sink(#[from] SinkError),

    /// Batch was cancelled before this record was admitted
    #[error("Batch aborted before record was processed")]
    BatchAbort,

    /// A stage panicked
    #[error("Stage panicked: {0}")]
    Panicked(String),
}

/// Caller-level batch error
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Concurrency must be at least 1 (got {0})")]
    InvalidConcurrency(usize),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed input row
    #[error("Invalid input at row {row}: {message}")]
    InvalidRow { row: usize, message: String },
}
