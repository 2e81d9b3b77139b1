//! `issue-unassigned` handler (spec.md §4.7.3): stop every Assistant for
//! the issue, post one farewell if at least one was active.

use std::sync::Arc;

use cyrus_core::IssueId;
use cyrus_tracker::ActivityType;

use crate::context::OrchestratorContext;
use crate::error::OrchestratorResult;

pub async fn handle(ctx: Arc<OrchestratorContext>, issue_id: IssueId) -> OrchestratorResult<()> {
    let sessions = ctx.store.get_for_issue(&issue_id);
    let mut stopped_any = false;
    for session in &sessions {
        if let Some((_, supervisor)) = ctx.assistants.remove(&session.id) {
            if supervisor.is_streaming() {
                supervisor.stop().await;
                stopped_any = true;
            }
        }
    }

    if stopped_any {
        if let Some(session) = sessions.first() {
            let _ = ctx
                .tracker
                .create_comment(&issue_id, "This issue was unassigned; stopping work.", None)
                .await;
            let _ = session;
        }
    }
    Ok(())
}
