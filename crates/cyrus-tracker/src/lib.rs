//! Rate-limited, retrying, response-cached client for the external
//! issue-tracker API (C1 in the architecture overview).

pub mod cache;
pub mod client;
pub mod error;
pub mod rate_limit;
pub mod retry;
pub mod types;

pub use client::{BotCommentSink, NullBotCommentSink, TrackerClient};
pub use error::{TrackerError, TrackerResult};
pub use retry::Backoff;
pub use types::{Ack, ActivityType, Comment, Issue, IssuePatch, Label, Team, WorkflowState};
