use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProcedureError {
    #[error("classification call exceeded its 30s timeout")]
    ClassificationTimedOut,
    #[error("classifier returned an error: {0}")]
    Classifier(String),
    #[error("unknown procedure: {0}")]
    UnknownProcedure(String),
    #[error("session has no procedure metadata to advance")]
    NoActiveProcedure,
}

pub type ProcedureResult<T> = Result<T, ProcedureError>;
