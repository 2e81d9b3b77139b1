//! Procedure Router (C5): classifies a session into a fixed bucket, picks a
//! named Procedure, and sequences its Subroutines.

pub mod catalog;
pub mod classify;
pub mod error;
pub mod progression;
pub mod router;

pub use catalog::{apply_control_mode, default_procedure_name, get_procedure};
pub use classify::{classify_with_fallback, ClassificationResult, Classifier, ProcessClassifier};
pub use error::{ProcedureError, ProcedureResult};
pub use progression::{get_current_subroutine, get_next_subroutine, initialize_procedure_metadata};
pub use router::{determine_routine, RoutineDecision};
