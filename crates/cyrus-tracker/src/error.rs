//! Tracker client error taxonomy.

use thiserror::Error;

/// Errors surfaced by the Tracker client.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// The token was rejected. Non-retryable; connection-fatal for the
    /// owning repository, surfaced to the orchestrator verbatim.
    #[error("tracker rejected token: {0}")]
    Auth(String),

    /// A transient error survived all retry attempts.
    #[error("tracker request failed after retries: {0}")]
    Transient(String),

    /// The response body could not be decoded.
    #[error("failed to decode tracker response: {0}")]
    Decode(String),
}

/// Result alias for Tracker client operations.
pub type TrackerResult<T> = Result<T, TrackerError>;
