//! Translate a decoded `(trackerToken, Event)` pair into a routed
//! `OrchestratorContext` call: dedup, route to a repository, fetch whatever
//! Tracker data the event itself doesn't carry, then hand off to C7.

use std::sync::Arc;

use cyrus_core::{Event, IssueId, IssueSnapshot};
use cyrus_orchestrator::OrchestratorContext;
use cyrus_orchestrator::handlers::{created, data_change, prompted, unassigned};
use cyrus_router::RoutingContext;
use cyrus_session::WebhookDeduplicator;
use cyrus_tracker::TrackerClient;

use crate::runtime::AppState;

/// Handle one decoded event delivered on `token`. Errors are logged and
/// swallowed — a single bad event must never take down the dispatch loop.
pub async fn dispatch(state: &Arc<AppState>, token: String, event: Event) {
    let dedup = state.dedup_for(&token);
    let fingerprint = WebhookDeduplicator::fingerprint(&event);
    if dedup.check_and_record(&fingerprint) {
        tracing::debug!(webhook_id = event.webhook_id(), "duplicate webhook delivery, dropping");
        return;
    }

    let candidates: Vec<_> = {
        let repositories = state.repositories.read().expect("repositories lock poisoned");
        repositories.for_token(&token).cloned().collect()
    };
    if candidates.is_empty() {
        tracing::warn!(token, "no repository configured for this tracker token");
        return;
    }

    let tracker = state.tracker_for(&token);
    let Some(repo_id) = route_event(&tracker, &candidates, &event).await else {
        tracing::warn!(webhook_id = event.webhook_id(), "no repository matched this event");
        return;
    };

    let Some(ctx) = state.context_for(&repo_id) else {
        tracing::warn!(repository = %repo_id, "routed to a repository with no live context");
        return;
    };

    if let Err(err) = handle_event(ctx, event).await {
        tracing::error!(error = %err, "orchestrator handler failed");
    }
}

async fn route_event(tracker: &TrackerClient, candidates: &[cyrus_core::Repository], event: &Event) -> Option<cyrus_core::RepositoryId> {
    if candidates.len() == 1 {
        return Some(candidates[0].id.clone());
    }
    let issue_id = event.issue_id()?;
    let issue = tracker.get_issue(issue_id).await.ok()?;
    let refs: Vec<&cyrus_core::Repository> = candidates.iter().collect();
    let ctx = RoutingContext {
        labels: &issue.labels,
        project: issue.project.as_deref(),
        team_key: Some(issue.team_key.as_str()),
        identifier: &issue.identifier,
    };
    cyrus_router::route(&ctx, &refs).map(|r| r.id.clone())
}

async fn issue_snapshot_and_labels(tracker: &TrackerClient, issue_id: &IssueId) -> Option<(IssueSnapshot, Vec<String>)> {
    let issue = tracker.get_issue(issue_id).await.ok()?;
    Some((
        IssueSnapshot {
            id: issue.id,
            identifier: issue.identifier,
            title: issue.title,
            description: issue.description,
            branch_name: issue.branch_name,
        },
        issue.labels,
    ))
}

async fn handle_event(ctx: Arc<OrchestratorContext>, event: Event) -> cyrus_orchestrator::OrchestratorResult<()> {
    match event {
        Event::SessionCreated {
            session_id,
            issue_id,
            synthetic,
            originating_comment,
            ..
        } => {
            let Some((issue, labels)) = issue_snapshot_and_labels(&ctx.tracker, &issue_id).await else {
                return Ok(());
            };
            created::handle(
                ctx,
                created::CreatedParams {
                    session_id,
                    issue_id,
                    issue,
                    labels,
                    originating_comment,
                    parent_branch: None,
                    acknowledge: !synthetic,
                },
            )
            .await
        }
        Event::SessionPrompted {
            session_id,
            prompt,
            signal,
            comment,
            ..
        } => {
            prompted::handle(
                ctx,
                prompted::PromptedParams {
                    session_id,
                    prompt,
                    signal,
                    comment,
                },
            )
            .await
        }
        Event::IssueAssigned {
            issue_id,
            previous_assignee,
            current_assignee,
            workflow_state_type,
            workflow_state_name,
            ..
        } => {
            let Some((issue, labels)) = issue_snapshot_and_labels(&ctx.tracker, &issue_id).await else {
                return Ok(());
            };
            data_change::handle_issue_assigned(
                ctx,
                issue_id,
                issue,
                labels,
                previous_assignee,
                current_assignee,
                &workflow_state_type,
                &workflow_state_name,
            )
            .await
        }
        Event::IssueUnassigned { issue_id, .. } => unassigned::handle(ctx, issue_id).await,
        Event::IssueEdited { issue_id, changes, .. } => {
            data_change::handle_issue_edited(&ctx, &issue_id, changes);
            Ok(())
        }
        Event::CommentCreated { issue_id, comment, .. } => {
            let Some((issue, labels)) = issue_snapshot_and_labels(&ctx.tracker, &issue_id).await else {
                return Ok(());
            };
            data_change::handle_comment_created(ctx, issue_id, issue, labels, comment).await
        }
    }
}
