//! Shared error type for invariant violations caught at construction time.

use thiserror::Error;

/// Errors raised while constructing or mutating core domain types.
#[derive(Debug, Error)]
pub enum CoreError {
    /// `metadata.shouldReplyInThread` was set without an anchoring comment.
    #[error("shouldReplyInThread requires an originalCommentId")]
    ThreadReplyWithoutOriginalComment,

    /// A webhook payload could not be decoded into a known `Event` variant.
    #[error("unrecognized webhook payload: {0}")]
    UnrecognizedEvent(String),

    /// A procedure was referenced by name but is not registered.
    #[error("unknown procedure: {0}")]
    UnknownProcedure(String),

    /// Attempted to advance a session past its procedure's last subroutine.
    #[error("procedure {0} has no further subroutines")]
    ProcedureExhausted(String),
}

/// Result alias for core domain operations.
pub type CoreResult<T> = Result<T, CoreError>;
