//! Subroutine advancement on Assistant terminal `result` (spec.md §4.7.8),
//! shared by the session-created and session-prompted handlers since both
//! start a stream that may eventually terminate.

use std::sync::Arc;

use cyrus_assistant::{OutboundMessage, StartParams};
use cyrus_core::{AgentSessionEntry, CommentId, EntryType, SessionId};
use cyrus_procedure::get_current_subroutine;
use cyrus_tracker::ActivityType;
use tokio::sync::mpsc::UnboundedReceiver;

/// Hard cap on how far `resolve_thread_root` walks up a comment's parent
/// chain, so a cyclic or unexpectedly deep thread can never hang a session.
const MAX_THREAD_WALK_DEPTH: u32 = 64;

use crate::context::OrchestratorContext;
use crate::prompt::with_response_template;

/// Drain a session's Assistant output until the stream ends, advancing the
/// procedure on each terminal `result` and posting the thread reply once
/// the last Subroutine completes.
pub async fn watch_stream(ctx: Arc<OrchestratorContext>, session_id: SessionId, mut messages: UnboundedReceiver<OutboundMessage>) {
    while let Some(message) = messages.recv().await {
        match message {
            OutboundMessage::Thought { content } => {
                ctx.store.append_entry(&session_id, AgentSessionEntry::new(EntryType::Thought, content.clone()));
                let _ = ctx.tracker.create_agent_activity(&session_id, ActivityType::Thought, &content).await;
            }
            OutboundMessage::Assistant { content } => {
                ctx.store.append_entry(&session_id, AgentSessionEntry::new(EntryType::Assistant, content.clone()));
                let _ = ctx.tracker.create_agent_activity(&session_id, ActivityType::Response, &content).await;
            }
            OutboundMessage::ToolUse { tool_use_id, content } => {
                ctx.store.append_entry(
                    &session_id,
                    AgentSessionEntry::new(EntryType::ToolUse, content).with_tool_use_id(tool_use_id),
                );
            }
            OutboundMessage::ToolResult { tool_use_id, content } => {
                ctx.store.append_entry(
                    &session_id,
                    AgentSessionEntry::new(EntryType::ToolResult, content).with_tool_use_id(tool_use_id),
                );
            }
            OutboundMessage::Error { message } => {
                tracing::warn!(session_id = %session_id, error = message, "assistant reported an error");
            }
            OutboundMessage::Result { assistant_session_id, content } => {
                on_terminal_result(&ctx, &session_id, assistant_session_id, content).await;
                break;
            }
        }
    }
}

async fn on_terminal_result(ctx: &Arc<OrchestratorContext>, session_id: &SessionId, assistant_session_id: String, content: String) {
    let Some(mut session) = ctx.store.get(session_id) else { return };
    session.assistant_session_id = Some(assistant_session_id.clone());
    ctx.store.upsert(session.clone());

    let Some(mut metadata) = session.metadata.procedure.clone() else { return };

    if let Ok(Some(current)) = get_current_subroutine(&metadata) {
        if current.kind == "select-template" {
            if let Ok(parsed) = serde_json::from_str::<TemplateSelection>(&content) {
                session.metadata.response_template = Some(parsed.template);
                ctx.store.upsert(session.clone());
            }
        }
        metadata.advance(&current);
        ctx.store.set_procedure_metadata(session_id, metadata.clone());
    }

    match get_current_subroutine(&metadata) {
        Ok(Some(next)) => {
            let prompt = with_response_template(&next.description, session.metadata.response_template.as_deref());
            let supervisor = ctx.assistant_for(session_id);
            supervisor.stop().await;
            let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
            let params = StartParams {
                prompt,
                resume_session_id: Some(assistant_session_id),
                max_turns: Some(next.max_turns),
                system_prompt: None,
            };
            match supervisor.start(params, tx).await {
                Ok(()) => {
                    tokio::spawn(watch_stream(Arc::clone(ctx), session_id.clone(), rx));
                }
                Err(err) => {
                    tracing::error!(session_id = %session_id, subroutine = next.name, error = %err, "failed to start next subroutine");
                }
            }
        }
        _ => {
            if session.metadata.should_reply_in_thread && !ctx.index.thread_reply_already_posted(session_id) {
                if let Some(comment_id) = session.metadata.original_comment_id.clone() {
                    let parent_id = resolve_thread_root(ctx, &comment_id).await;
                    if let Ok(comment) = ctx.tracker.create_comment(&session.issue_id, &content, Some(&parent_id)).await {
                        let _ = comment;
                    }
                    ctx.store.mark_thread_reply_posted(session_id);
                    ctx.index.mark_thread_reply_posted(session_id.clone());

                    if let Some(reaction_id) = session.metadata.reaction_id.take() {
                        let _ = ctx.tracker.delete_reaction(&reaction_id).await;
                        ctx.store.set_reaction_id(session_id, None);
                    }
                    let _ = ctx.tracker.add_reaction(&comment_id, "✅").await;
                    ctx.index.clear_unresponded(&comment_id);
                }
            }
        }
    }
}

/// Walk a comment's `parent_id` chain up to its top-level ancestor, so a
/// thread reply always lands on the root comment rather than a nested one
/// (spec.md §4.7.8). Falls back to `comment_id` itself if any hop fails.
async fn resolve_thread_root(ctx: &Arc<OrchestratorContext>, comment_id: &CommentId) -> CommentId {
    let mut current = comment_id.clone();
    for _ in 0..MAX_THREAD_WALK_DEPTH {
        let Ok(comment) = ctx.tracker.get_comment(&current).await else {
            return current;
        };
        match comment.parent_id {
            Some(parent_id) => current = parent_id,
            None => return current,
        }
    }
    current
}

#[derive(serde::Deserialize)]
struct TemplateSelection {
    template: String,
    #[serde(default)]
    #[allow(dead_code)]
    reasoning: String,
}
