//! Graceful shutdown sequencing (spec.md §5), grounded on the teacher's
//! `astrid-gateway::server::lifecycle` unload-in-dependency-order pattern
//! and `astrid-cli::daemon_main`'s task-abort-then-persist shutdown flow.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use cyrus_persistence::PersistedState;

use crate::runtime::AppState;

/// Cap on the whole shutdown sequence; a step that hangs past this is
/// abandoned and the process exits anyway (spec.md §5.218).
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Cancel the config watcher and transports (already stopped by the
/// caller), stop every Assistant and TTL sweeper, and flush session state
/// to disk — all within a 30s cap.
pub async fn shutdown(state: Arc<AppState>, state_dir: &Path) {
    let result = tokio::time::timeout(SHUTDOWN_TIMEOUT, run(&state, state_dir)).await;
    if result.is_err() {
        tracing::warn!("shutdown sequence exceeded its 30s cap, exiting anyway");
    }
}

async fn run(state: &Arc<AppState>, state_dir: &Path) {
    tracing::info!("stopping assistants and session index sweepers");
    state.shutdown_all().await;

    tracing::info!("persisting session state");
    let snapshot = PersistedState::snapshot(&state.snapshot_stores());
    if let Err(err) = cyrus_persistence::save(state_dir, &snapshot).await {
        tracing::error!(error = %err, "failed to persist session state during shutdown");
    }
}
