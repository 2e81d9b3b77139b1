//! `AgentSession`: a Tracker-side threaded conversation bound to a single issue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{CommentId, IssueId, ReactionId, SessionId};
use crate::procedure::ProcedureMetadata;

/// Minimal issue snapshot carried on a session (full issue detail lives in
/// the Tracker; this is the slice the orchestrator needs without re-fetching).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueSnapshot {
    pub id: IssueId,
    pub identifier: String,
    pub title: String,
    pub description: String,
    pub branch_name: String,
}

/// The on-disk working directory used by the Assistant for a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workspace {
    pub path: std::path::PathBuf,
    pub is_git_worktree: bool,
}

/// Lifecycle status of an `AgentSession`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Pending,
    Active,
    Completed,
    Failed,
    Stopped,
}

/// A single recorded change to the tracked issue (status, priority, assignee,
/// labels, project, title, or description), appended by the `Issue edited`
/// data-change handler. Never drives auto-advancement on its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueChangeRecord {
    pub field: String,
    pub previous: Option<String>,
    pub current: Option<String>,
    pub changed_at: DateTime<Utc>,
}

/// Bookkeeping carried on an `AgentSession` beyond its procedure state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMetadata {
    #[serde(default)]
    pub procedure: Option<ProcedureMetadata>,
    #[serde(default)]
    pub issue_change_history: Vec<IssueChangeRecord>,
    #[serde(default)]
    pub original_comment_id: Option<CommentId>,
    #[serde(default)]
    pub original_comment_body: Option<String>,
    #[serde(default)]
    pub should_reply_in_thread: bool,
    #[serde(default)]
    pub response_template: Option<String>,
    /// Set once a thread reply has been posted for this session, so a
    /// duplicate terminal `result` never posts twice (TTL 5 min window is
    /// enforced by `cyrus-session::index`, this flag is the durable half).
    #[serde(default)]
    pub thread_reply_posted: bool,
    /// The Tracker reaction id placed on the originating comment to signal
    /// "working on it", if any. Cleared or swapped as the session progresses.
    #[serde(default)]
    pub reaction_id: Option<ReactionId>,
}

impl Default for SessionMetadata {
    fn default() -> Self {
        Self {
            procedure: None,
            issue_change_history: Vec::new(),
            original_comment_id: None,
            original_comment_body: None,
            should_reply_in_thread: false,
            response_template: None,
            thread_reply_posted: false,
            reaction_id: None,
        }
    }
}

impl SessionMetadata {
    /// Validates the invariant `shouldReplyInThread ⇒ originalCommentId ≠ ∅`.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.should_reply_in_thread || self.original_comment_id.is_some()
    }
}

/// A Tracker-side threaded conversation bound to a single issue.
///
/// Note: a live Assistant Supervisor is deliberately *not* a field here.
/// `AgentSession` is the durable, serializable half of a session; the
/// supervisor handle lives alongside it in the caller's session map (mirrors
/// the teacher's split between `AgentSession` data and `SessionHandle`
/// live-reference wrapper in `astrid-gateway::server::mod`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSession {
    pub id: SessionId,
    pub issue_id: IssueId,
    pub issue: IssueSnapshot,
    pub workspace: Workspace,
    #[serde(default)]
    pub assistant_session_id: Option<String>,
    pub status: SessionStatus,
    #[serde(default)]
    pub metadata: SessionMetadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AgentSession {
    #[must_use]
    pub fn new(id: SessionId, issue_id: IssueId, issue: IssueSnapshot, workspace: Workspace) -> Self {
        let now = Utc::now();
        Self {
            id,
            issue_id,
            issue,
            workspace,
            assistant_session_id: None,
            status: SessionStatus::Pending,
            metadata: SessionMetadata::default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
