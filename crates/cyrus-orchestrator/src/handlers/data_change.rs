//! Data-change handlers (spec.md §4.7.4): issue-assigned transition,
//! issue-edited change recording, and the comment-created should-respond
//! decision.

use std::sync::Arc;

use cyrus_core::{CommentRef, FieldChange, IssueChangeRecord, IssueId, IssueSnapshot};

use crate::context::OrchestratorContext;
use crate::error::OrchestratorResult;
use crate::handlers::created::{self, CreatedParams};

const NON_STARTING_WORKFLOW_TYPES: &[&str] = &["backlog", "completed", "canceled"];

/// Whether an assignee transition should synthesize a new session. A
/// workflow state blocks creation if its type is a non-starting type, or if
/// its name contains a non-starting substring (case-insensitive) — some
/// trackers let teams define custom states like "Done - Needs Release"
/// whose type alone wouldn't catch it.
#[must_use]
pub fn qualifies_for_session_creation(
    previous_assignee: Option<&str>,
    current_assignee: Option<&str>,
    workflow_state_type: &str,
    workflow_state_name: &str,
) -> bool {
    let name_lower = workflow_state_name.to_lowercase();
    let blocked_by_name = NON_STARTING_WORKFLOW_TYPES.iter().any(|kind| name_lower.contains(kind));
    previous_assignee.is_none() && current_assignee.is_some() && !NON_STARTING_WORKFLOW_TYPES.contains(&workflow_state_type) && !blocked_by_name
}

/// Synthesize a `session-created` event when an issue transitions from
/// unassigned to assigned, unless it landed in backlog/completed/canceled.
pub async fn handle_issue_assigned(
    ctx: Arc<OrchestratorContext>,
    issue_id: IssueId,
    issue: IssueSnapshot,
    labels: Vec<String>,
    previous_assignee: Option<String>,
    current_assignee: Option<String>,
    workflow_state_type: &str,
    workflow_state_name: &str,
) -> OrchestratorResult<()> {
    if !qualifies_for_session_creation(
        previous_assignee.as_deref(),
        current_assignee.as_deref(),
        workflow_state_type,
        workflow_state_name,
    ) {
        return Ok(());
    }
    let session_id = cyrus_core::SessionId::from(uuid::Uuid::new_v4().to_string());
    created::handle(
        ctx,
        CreatedParams {
            session_id,
            issue_id,
            issue,
            labels,
            originating_comment: None,
            parent_branch: None,
            acknowledge: false,
        },
    )
    .await
}

/// Record a change to the tracked issue into every active session's
/// `issueChangeHistory`. Never auto-advances anything.
pub fn handle_issue_edited(ctx: &Arc<OrchestratorContext>, issue_id: &IssueId, changes: Vec<FieldChange>) {
    for mut session in ctx.store.get_for_issue(issue_id) {
        for change in &changes {
            session.metadata.issue_change_history.push(IssueChangeRecord {
                field: change.field.clone(),
                previous: change.previous.clone(),
                current: change.current.clone(),
                changed_at: chrono::Utc::now(),
            });
        }
        ctx.store.upsert(session);
    }
}

/// Should-respond decision for `Comment.create` (spec.md §4.7.7): if it
/// qualifies, synthesize a session-created event anchored to the comment.
pub async fn handle_comment_created(
    ctx: Arc<OrchestratorContext>,
    issue_id: IssueId,
    issue: IssueSnapshot,
    labels: Vec<String>,
    comment: CommentRef,
) -> OrchestratorResult<()> {
    let should_respond = ctx.index.should_respond_to_comment(
        &comment.id,
        &comment.author_user_id,
        comment.bot_actor,
        comment.parent_id.as_ref(),
        &comment.body,
    );
    if !should_respond {
        return Ok(());
    }
    let session_id = cyrus_core::SessionId::from(uuid::Uuid::new_v4().to_string());
    created::handle(
        ctx,
        CreatedParams {
            session_id,
            issue_id,
            issue,
            labels,
            originating_comment: Some(comment),
            parent_branch: None,
            acknowledge: false,
        },
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backlog_transition_does_not_qualify() {
        assert!(!qualifies_for_session_creation(None, Some("user-1"), "backlog", "Backlog"));
    }

    #[test]
    fn null_to_non_null_in_a_starting_state_qualifies() {
        assert!(qualifies_for_session_creation(None, Some("user-1"), "started", "In Progress"));
    }

    #[test]
    fn reassignment_between_two_users_does_not_qualify() {
        assert!(!qualifies_for_session_creation(Some("user-1"), Some("user-2"), "started", "In Progress"));
    }

    #[test]
    fn unassignment_does_not_qualify() {
        assert!(!qualifies_for_session_creation(Some("user-1"), None, "started", "In Progress"));
    }

    #[test]
    fn custom_state_named_with_a_non_starting_substring_does_not_qualify() {
        assert!(!qualifies_for_session_creation(None, Some("user-1"), "started", "Done - Needs Release"));
    }

    #[test]
    fn custom_state_named_with_a_starting_word_qualifies() {
        assert!(qualifies_for_session_creation(None, Some("user-1"), "started", "Ready for Work"));
    }
}
