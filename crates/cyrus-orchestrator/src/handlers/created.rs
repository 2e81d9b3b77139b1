//! `session-created` handler (spec.md §4.7.1).

use std::collections::HashMap;
use std::sync::Arc;

use cyrus_assistant::StartParams;
use cyrus_core::{AgentSession, CommentRef, IssueId, IssueSnapshot, SessionId, Workspace};
use cyrus_procedure::{determine_routine, initialize_procedure_metadata};
use cyrus_tracker::ActivityType;

use crate::advance::watch_stream;
use crate::base_branch::select_base_branch;
use crate::context::OrchestratorContext;
use crate::error::OrchestratorResult;
use crate::prompt::{
    build_initial_prompt, build_system_prompt, extract_version_tag, format_comment_threads, label_prompt_for, select_initial_prompt_template,
    should_select_system_prompt_by_label, InitialPromptInputs, InitialPromptTemplate,
};
use crate::tool_policy;

pub struct CreatedParams {
    pub session_id: SessionId,
    pub issue_id: IssueId,
    pub issue: IssueSnapshot,
    /// The issue's current Tracker labels, used for the debugger/orchestrator
    /// label override ahead of classification.
    pub labels: Vec<String>,
    pub originating_comment: Option<CommentRef>,
    pub parent_branch: Option<String>,
    /// False when synthesized from a data-change handler — in that case the
    /// initial Tracker acknowledgment is skipped (spec.md §4.7.1 step 1).
    pub acknowledge: bool,
}

/// Create the session, classify it, build its tool policy, and start the
/// Assistant on its first Subroutine.
pub async fn handle(ctx: Arc<OrchestratorContext>, params: CreatedParams) -> OrchestratorResult<()> {
    if params.acknowledge {
        let _ = ctx
            .tracker
            .create_agent_activity(&params.session_id, ActivityType::Thought, "Acknowledged, looking into this now.")
            .await;
    }

    let base_branch = select_base_branch(&ctx.repository.base_branch, params.parent_branch.as_deref());
    let workspace = Workspace {
        path: ctx
            .repository
            .workspace_base_dir
            .join(params.issue.identifier.replace('/', "-")),
        is_git_worktree: true,
    };

    let mut session = AgentSession::new(params.session_id.clone(), params.issue_id.clone(), params.issue.clone(), workspace);
    if let Some(comment) = &params.originating_comment {
        session.metadata.original_comment_id = Some(comment.id.clone());
        session.metadata.original_comment_body = Some(comment.body.clone());
        session.metadata.should_reply_in_thread = true;

        let replies_to_bot = comment.parent_id.as_ref().is_some_and(|p| ctx.index.is_bot_parent_comment(p));
        if replies_to_bot {
            if let Ok(reaction_id) = ctx.tracker.add_reaction(&comment.id, "⏳").await {
                session.metadata.reaction_id = Some(reaction_id);
                ctx.index.mark_unresponded(comment.id.clone());
            }
        }
    }

    let classify_text = format!("{}\n\n{}", params.issue.title, params.issue.description);
    let decision = determine_routine(
        ctx.classifier.as_ref(),
        &ctx.repository,
        &params.labels,
        &classify_text,
        ctx.control_mode_enabled,
    )
    .await;

    tracing::info!(session_id = %session.id, reasoning = decision.reasoning, "routed session");

    let metadata = initialize_procedure_metadata(&decision.procedure_name);
    session.metadata.procedure = Some(metadata.clone());
    ctx.store.upsert(session.clone());

    let Ok(Some(first_subroutine)) = cyrus_procedure::get_current_subroutine(&metadata) else {
        return Ok(());
    };

    let (allowed, disallowed) = tool_policy::resolve(&ctx.repository, &first_subroutine.kind, &ctx.tool_defaults);
    tracing::debug!(allowed = allowed.len(), disallowed = disallowed.len(), "resolved tool policy");

    let originating_body = params.originating_comment.as_ref().map(|c| c.body.as_str());

    let system_prompt = if should_select_system_prompt_by_label(originating_body) {
        Some(build_system_prompt(&ctx.repository, decision.classification))
    } else {
        None
    };

    let (template, comment_threads) = match ctx.tracker.list_comments(&params.issue_id).await {
        Ok(comments) => (select_initial_prompt_template(originating_body), format_comment_threads(&comments)),
        Err(err) => {
            tracing::warn!(error = %err, session_id = %session.id, "failed to fetch comment threads, falling back to a synthetic prompt");
            (InitialPromptTemplate::Fallback, String::new())
        }
    };
    let prompt_inputs = InitialPromptInputs {
        repository: &ctx.repository,
        issue: &params.issue,
        base_branch: &base_branch,
        comment_threads: &comment_threads,
        new_comment_body: params.originating_comment.as_ref().map(|c| c.body.as_str()),
        new_comment_author: params.originating_comment.as_ref().map(|c| c.author_user_id.as_str()),
        is_thread_reply: session.metadata.should_reply_in_thread,
    };
    let initial_prompt = build_initial_prompt(&prompt_inputs, template, &first_subroutine.description);

    let supervisor = ctx.assistant_for(&session.id);
    if let Some(label_prompt) = label_prompt_for(&ctx.repository.label_prompts, decision.classification) {
        if let Some(version) = extract_version_tag(label_prompt) {
            let mut versions = HashMap::new();
            versions.insert(decision.classification.as_str().to_string(), version);
            supervisor.update_prompt_versions(versions).await;
        }
    }

    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    let params = StartParams {
        prompt: initial_prompt,
        resume_session_id: None,
        max_turns: Some(first_subroutine.max_turns),
        system_prompt,
    };
    supervisor.start(params, tx).await?;
    tokio::spawn(watch_stream(ctx, session.id.clone(), rx));
    Ok(())
}
