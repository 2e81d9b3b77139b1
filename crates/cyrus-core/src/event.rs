//! Incoming events modeled as a tagged union, per design note §9
//! ("dynamic event narrowing" — dispatch with exhaustiveness, not runtime
//! type predicates).

use serde::{Deserialize, Serialize};

use crate::ids::{CommentId, IssueId, SessionId};

/// Minimal comment slice carried on comment-shaped events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentRef {
    pub id: CommentId,
    pub body: String,
    pub author_user_id: String,
    pub parent_id: Option<CommentId>,
    #[serde(default)]
    pub bot_actor: bool,
}

/// A field-level change carried on an `Issue.Edited` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldChange {
    pub field: String,
    pub previous: Option<String>,
    pub current: Option<String>,
}

/// An inbound webhook event, already decoded and deduplicated, ready for
/// routing and dispatch to the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    SessionCreated {
        webhook_id: String,
        organization_id: String,
        session_id: SessionId,
        issue_id: IssueId,
        /// True when synthesized from a data-change handler rather than
        /// delivered directly by the Tracker.
        synthetic: bool,
        /// Present when the session is anchored to a specific comment
        /// (thread-reply mode).
        originating_comment: Option<CommentRef>,
    },
    SessionPrompted {
        webhook_id: String,
        organization_id: String,
        session_id: SessionId,
        prompt: String,
        /// `Some("stop")` halts the Assistant instead of prompting it.
        signal: Option<String>,
        comment: Option<CommentRef>,
    },
    IssueAssigned {
        webhook_id: String,
        organization_id: String,
        issue_id: IssueId,
        previous_assignee: Option<String>,
        current_assignee: Option<String>,
        workflow_state_type: String,
        workflow_state_name: String,
    },
    IssueUnassigned {
        webhook_id: String,
        organization_id: String,
        issue_id: IssueId,
    },
    IssueEdited {
        webhook_id: String,
        organization_id: String,
        issue_id: IssueId,
        changes: Vec<FieldChange>,
    },
    CommentCreated {
        webhook_id: String,
        organization_id: String,
        issue_id: IssueId,
        comment: CommentRef,
    },
}

impl Event {
    #[must_use]
    pub fn webhook_id(&self) -> &str {
        match self {
            Event::SessionCreated { webhook_id, .. }
            | Event::SessionPrompted { webhook_id, .. }
            | Event::IssueAssigned { webhook_id, .. }
            | Event::IssueUnassigned { webhook_id, .. }
            | Event::IssueEdited { webhook_id, .. }
            | Event::CommentCreated { webhook_id, .. } => webhook_id,
        }
    }

    /// The `(event_type, event_action, primary_subject_id, revision_or_timestamp)`
    /// tuple a webhook fingerprint is hashed from.
    #[must_use]
    pub fn fingerprint_key(&self) -> (String, String, String, String) {
        match self {
            Event::SessionCreated {
                session_id,
                webhook_id,
                ..
            } => (
                "session".into(),
                "created".into(),
                session_id.to_string(),
                webhook_id.clone(),
            ),
            Event::SessionPrompted {
                session_id,
                webhook_id,
                ..
            } => (
                "session".into(),
                "prompted".into(),
                session_id.to_string(),
                webhook_id.clone(),
            ),
            Event::IssueAssigned {
                issue_id,
                webhook_id,
                ..
            } => (
                "issue".into(),
                "assigned".into(),
                issue_id.to_string(),
                webhook_id.clone(),
            ),
            Event::IssueUnassigned {
                issue_id,
                webhook_id,
                ..
            } => (
                "issue".into(),
                "unassigned".into(),
                issue_id.to_string(),
                webhook_id.clone(),
            ),
            Event::IssueEdited {
                issue_id,
                webhook_id,
                ..
            } => (
                "issue".into(),
                "edited".into(),
                issue_id.to_string(),
                webhook_id.clone(),
            ),
            Event::CommentCreated {
                comment, webhook_id, ..
            } => (
                "comment".into(),
                "created".into(),
                comment.id.to_string(),
                webhook_id.clone(),
            ),
        }
    }

    #[must_use]
    pub fn issue_id(&self) -> Option<&IssueId> {
        match self {
            Event::SessionCreated { issue_id, .. }
            | Event::IssueAssigned { issue_id, .. }
            | Event::IssueUnassigned { issue_id, .. }
            | Event::IssueEdited { issue_id, .. }
            | Event::CommentCreated { issue_id, .. } => Some(issue_id),
            Event::SessionPrompted { .. } => None,
        }
    }
}
