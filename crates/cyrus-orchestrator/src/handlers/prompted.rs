//! `session-prompted` handler (spec.md §4.7.2): append to a live stream, or
//! re-route and resume a cold one. A `"stop"` signal halts the Assistant
//! instead.

use std::sync::Arc;

use cyrus_assistant::StartParams;
use cyrus_core::{CommentRef, SessionId};
use cyrus_procedure::determine_routine;
use cyrus_tracker::ActivityType;

use crate::advance::watch_stream;
use crate::context::OrchestratorContext;
use crate::error::{OrchestratorError, OrchestratorResult};

pub struct PromptedParams {
    pub session_id: SessionId,
    pub prompt: String,
    pub signal: Option<String>,
    pub comment: Option<CommentRef>,
}

pub async fn handle(ctx: Arc<OrchestratorContext>, params: PromptedParams) -> OrchestratorResult<()> {
    let Some(session) = ctx.store.get(&params.session_id) else {
        return Err(OrchestratorError::SessionNotFound(params.session_id));
    };
    let supervisor = ctx.assistant_for(&params.session_id);

    if params.signal.as_deref() == Some("stop") {
        supervisor.stop().await;
        let _ = ctx
            .tracker
            .create_agent_activity(&params.session_id, ActivityType::Response, "Cancelled.")
            .await;
        return Ok(());
    }

    if supervisor.is_streaming() {
        let _ = ctx
            .tracker
            .create_agent_activity(&params.session_id, ActivityType::Response, "Queued as guidance")
            .await;
        supervisor.add_stream_message(params.prompt).await?;
        return Ok(());
    }

    let _ = ctx
        .tracker
        .create_agent_activity(&params.session_id, ActivityType::Response, "Getting started...")
        .await;

    let decision = determine_routine(ctx.classifier.as_ref(), &ctx.repository, &[], &params.prompt, ctx.control_mode_enabled).await;
    let metadata = cyrus_procedure::initialize_procedure_metadata(&decision.procedure_name);
    ctx.store.set_procedure_metadata(&params.session_id, metadata);

    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    let start_params = StartParams {
        prompt: params.prompt,
        resume_session_id: session.assistant_session_id.clone(),
        max_turns: None,
        system_prompt: None,
    };
    supervisor.start(start_params, tx).await?;
    tokio::spawn(watch_stream(ctx, params.session_id, rx));
    Ok(())
}
