//! `AgentSessionEntry`: one append-only record per assistant/user turn or tool use.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The kind of a session entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    User,
    Assistant,
    ToolUse,
    ToolResult,
    Thought,
}

/// A single append-only entry in an `AgentSession`'s transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSessionEntry {
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    pub content: String,
    #[serde(default)]
    pub tool_use_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl AgentSessionEntry {
    #[must_use]
    pub fn new(entry_type: EntryType, content: impl Into<String>) -> Self {
        Self {
            entry_type,
            content: content.into(),
            tool_use_id: None,
            timestamp: Utc::now(),
        }
    }

    #[must_use]
    pub fn with_tool_use_id(mut self, id: impl Into<String>) -> Self {
        self.tool_use_id = Some(id.into());
        self
    }
}
