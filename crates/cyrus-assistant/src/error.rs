use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("failed to spawn assistant process: {0}")]
    Spawn(std::io::Error),
    #[error("failed to write to assistant stdin: {0}")]
    Write(std::io::Error),
    #[error("assistant stdout closed unexpectedly")]
    StreamClosed,
    #[error("failed to decode assistant message: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("a start/stop is already in progress for this session")]
    AlreadyStreaming,
    #[error("no assistant is currently streaming for this session")]
    NotStreaming,
}

/// `stop()` is cooperative and idempotent; callers are expected to swallow
/// this variant rather than treat it as a failure (spec.md §5).
#[derive(Debug, Error)]
#[error("assistant stream aborted")]
pub struct AbortError;

pub type AssistantResult<T> = Result<T, AssistantError>;
