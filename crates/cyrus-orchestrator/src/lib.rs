//! Session Orchestrator (C7): handles the four session event classes,
//! owns session transitions, drives the Procedure Router and Assistant
//! Supervisor, and reports activity back to the Tracker.

pub mod advance;
pub mod base_branch;
pub mod context;
pub mod error;
pub mod handlers;
pub mod prompt;
pub mod tool_policy;

pub use context::OrchestratorContext;
pub use error::{OrchestratorError, OrchestratorResult};
