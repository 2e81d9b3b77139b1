//! `getCurrentSubroutine`/`getNextSubroutine`/`initializeProcedureMetadata`:
//! pure functions over an `AgentSession`'s procedure metadata (spec.md
//! §4.5). None of these touch the session store directly — callers in
//! `cyrus-orchestrator` persist the result.

use cyrus_core::{ProcedureMetadata, Subroutine};

use crate::catalog::get_procedure;
use crate::error::{ProcedureError, ProcedureResult};

/// Build fresh procedure metadata for a session that just had a procedure
/// assigned by the Router.
#[must_use]
pub fn initialize_procedure_metadata(procedure_name: &str) -> ProcedureMetadata {
    ProcedureMetadata::new(procedure_name)
}

/// The subroutine a session is currently executing, or `None` if the
/// procedure is already exhausted.
pub fn get_current_subroutine(metadata: &ProcedureMetadata) -> ProcedureResult<Option<Subroutine>> {
    let procedure = get_procedure(&metadata.name).ok_or_else(|| ProcedureError::UnknownProcedure(metadata.name.clone()))?;
    Ok(procedure.subroutine_at(metadata.current_index).cloned())
}

/// The subroutine that follows the current one, without advancing.
/// `None` once the current subroutine is the procedure's last step.
pub fn get_next_subroutine(metadata: &ProcedureMetadata) -> ProcedureResult<Option<Subroutine>> {
    let procedure = get_procedure(&metadata.name).ok_or_else(|| ProcedureError::UnknownProcedure(metadata.name.clone()))?;
    Ok(procedure.subroutine_at(metadata.current_index + 1).cloned())
}
