//! The newline-delimited JSON protocol spoken over the Assistant child
//! process's stdio: one JSON object per line in each direction.

use serde::{Deserialize, Serialize};

/// A message sent to the Assistant's stdin.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    /// First message of a stream: either a fresh start or a resume of a
    /// previous `assistant_session_id`.
    Start {
        prompt: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        resume_session_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        max_turns: Option<u32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        system_prompt: Option<String>,
    },
    /// Appended to a live stream (spec.md §4.7.2: "append the new message...
    /// do not re-route").
    StreamMessage { content: String },
    Stop,
}

/// A message read from the Assistant's stdout.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    Thought { content: String },
    Assistant { content: String },
    ToolUse { tool_use_id: String, content: String },
    ToolResult { tool_use_id: String, content: String },
    /// Terminal message for a turn: carries the new `assistant_session_id`
    /// (for resumption) and the final response text.
    Result {
        assistant_session_id: String,
        content: String,
    },
    Error { message: String },
}
