use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("session {0} not found")]
    SessionNotFound(cyrus_core::SessionId),
    #[error(transparent)]
    Tracker(#[from] cyrus_tracker::TrackerError),
    #[error(transparent)]
    Procedure(#[from] cyrus_procedure::ProcedureError),
    #[error(transparent)]
    Assistant(#[from] cyrus_assistant::AssistantError),
    #[error("session metadata is missing an original comment but thread-reply mode is set")]
    InvalidMetadata,
}

pub type OrchestratorResult<T> = Result<T, OrchestratorError>;
