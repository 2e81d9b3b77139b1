//! Procedure / Subroutine: the ordered plan a session executes.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The fixed classification buckets a Procedure Router can choose from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Classification {
    Debugger,
    Orchestrator,
    Builder,
    Scoper,
}

impl Classification {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debugger => "debugger",
            Self::Orchestrator => "orchestrator",
            Self::Builder => "builder",
            Self::Scoper => "scoper",
        }
    }
}

/// One step of a Procedure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subroutine {
    pub name: String,
    pub description: String,
    pub prompt_path: PathBuf,
    pub max_turns: u32,
    pub kind: String,
}

/// An ordered list of Subroutines forming a worker's plan for a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Procedure {
    pub name: String,
    pub subroutines: Vec<Subroutine>,
}

impl Procedure {
    #[must_use]
    pub fn subroutine_at(&self, index: usize) -> Option<&Subroutine> {
        self.subroutines.get(index)
    }
}

/// A historical record of a completed subroutine, kept for audit/replay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubroutineHistoryEntry {
    pub subroutine_name: String,
    pub completed_at: chrono::DateTime<chrono::Utc>,
}

/// The procedure bookkeeping stored on `AgentSession::metadata`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcedureMetadata {
    pub name: String,
    pub current_index: usize,
    #[serde(default)]
    pub subroutine_history: Vec<SubroutineHistoryEntry>,
}

impl ProcedureMetadata {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            current_index: 0,
            subroutine_history: Vec::new(),
        }
    }

    /// Advance the index by one. The index is monotonically non-decreasing —
    /// this is the only mutator and it never decreases `current_index`.
    pub fn advance(&mut self, completed: &Subroutine) {
        self.subroutine_history.push(SubroutineHistoryEntry {
            subroutine_name: completed.name.clone(),
            completed_at: chrono::Utc::now(),
        });
        self.current_index = self.current_index.saturating_add(1);
    }
}
