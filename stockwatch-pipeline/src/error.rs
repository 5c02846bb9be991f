//! Pipeline error types.
//!
//! Every failure mode has a named variant. Only catalog and configuration
//! errors are meant to reach the process host; the rest are turned into
//! result values inside the pipeline.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Product not found: {0}")]
    NotFound(String),

    #[error("Malformed sale event: {0}")]
    MalformedEvent(String),

    #[error("Notification delivery failed: {0}")]
    Delivery(String),

    #[error("Notification timed out after {0:?}")]
    Timeout(Duration),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Invalid configuration for {key}: {reason}")]
    Config { key: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Result type alias for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_message_keeps_sub_second_precision() {
        let err = PipelineError::Timeout(Duration::from_millis(250));
        assert_eq!(err.to_string(), "Notification timed out after 250ms");
    }
}
