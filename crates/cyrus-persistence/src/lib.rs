//! Persistence (C10): serialize/restore the Session Store's durable
//! content under `<cyrusHome>/state`. Ephemeral structures (dedup, bot
//! provenance, child↔parent, reactions TTL) are never persisted — only
//! `AgentSession` and `AgentSessionEntry` records (spec.md §4.10).

pub mod error;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cyrus_core::{AgentSession, AgentSessionEntry, RepositoryId, SessionId};
use cyrus_session::SessionStore;
use serde::{Deserialize, Serialize};

pub use error::{PersistenceError, PersistenceResult};

const STATE_FILE_NAME: &str = "state.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersistedState {
    #[serde(rename = "agentSessions")]
    pub agent_sessions: HashMap<RepositoryId, HashMap<SessionId, AgentSession>>,
    #[serde(rename = "agentSessionEntries")]
    pub agent_session_entries: HashMap<RepositoryId, HashMap<SessionId, Vec<AgentSessionEntry>>>,
}

impl PersistedState {
    /// Build a snapshot from the live per-repository stores.
    #[must_use]
    pub fn snapshot(stores: &HashMap<RepositoryId, Arc<SessionStore>>) -> Self {
        let mut agent_sessions = HashMap::new();
        let mut agent_session_entries = HashMap::new();
        for (repo_id, store) in stores {
            let mut sessions = HashMap::new();
            let mut entries = HashMap::new();
            for (session, session_entries) in store.snapshot() {
                entries.insert(session.id.clone(), session_entries);
                sessions.insert(session.id.clone(), session);
            }
            agent_sessions.insert(repo_id.clone(), sessions);
            agent_session_entries.insert(repo_id.clone(), entries);
        }
        Self {
            agent_sessions,
            agent_session_entries,
        }
    }

    /// Rebuild one `SessionStore` per repository recorded in this snapshot.
    #[must_use]
    pub fn restore_stores(self) -> HashMap<RepositoryId, Arc<SessionStore>> {
        let mut stores = HashMap::new();
        let mut entries_by_repo = self.agent_session_entries;
        for (repo_id, sessions) in self.agent_sessions {
            let entries = entries_by_repo.remove(&repo_id).unwrap_or_default();
            let snapshot = sessions
                .into_iter()
                .map(|(session_id, session)| {
                    let session_entries = entries.get(&session_id).cloned().unwrap_or_default();
                    (session, session_entries)
                })
                .collect();
            stores.insert(repo_id, SessionStore::restore(snapshot));
        }
        stores
    }
}

fn state_path(state_dir: &Path) -> PathBuf {
    state_dir.join(STATE_FILE_NAME)
}

/// Atomically write `state` to `<state_dir>/state.json` via a temp file plus
/// rename, so a crash mid-write never leaves a truncated state file.
pub async fn save(state_dir: &Path, state: &PersistedState) -> PersistenceResult<()> {
    tokio::fs::create_dir_all(state_dir)
        .await
        .map_err(|source| PersistenceError::Write {
            path: state_dir.to_path_buf(),
            source,
        })?;
    let path = state_path(state_dir);
    let tmp_path = path.with_extension("json.tmp");
    let body = serde_json::to_vec_pretty(state)?;
    tokio::fs::write(&tmp_path, &body)
        .await
        .map_err(|source| PersistenceError::Write {
            path: tmp_path.clone(),
            source,
        })?;
    tokio::fs::rename(&tmp_path, &path)
        .await
        .map_err(|source| PersistenceError::Write {
            path: path.clone(),
            source,
        })?;
    tracing::debug!(path = %path.display(), "persisted session state");
    Ok(())
}

/// Load state from `<state_dir>/state.json`, or an empty snapshot if the
/// file does not exist yet (first run).
pub async fn load(state_dir: &Path) -> PersistenceResult<PersistedState> {
    let path = state_path(state_dir);
    match tokio::fs::read(&path).await {
        Ok(body) => Ok(serde_json::from_slice(&body)?),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(PersistedState::default()),
        Err(source) => Err(PersistenceError::Read { path, source }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cyrus_core::{EntryType, IssueId, IssueSnapshot, Workspace};

    fn sample_session(id: &str) -> AgentSession {
        AgentSession::new(
            SessionId::from(id),
            IssueId::from("ENG-1"),
            IssueSnapshot {
                id: IssueId::from("ENG-1"),
                identifier: "ENG-1".into(),
                title: "title".into(),
                description: String::new(),
                branch_name: String::new(),
            },
            Workspace {
                path: "/tmp/ws".into(),
                is_git_worktree: false,
            },
        )
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new();
        let session = sample_session("s1");
        store.upsert(session.clone());
        store.append_entry(&session.id, AgentSessionEntry::new(EntryType::User, "hi"));

        let mut stores = HashMap::new();
        stores.insert(RepositoryId::from("repo-1"), Arc::new(store));
        let state = PersistedState::snapshot(&stores);
        save(dir.path(), &state).await.unwrap();

        let loaded = load(dir.path()).await.unwrap();
        let restored = loaded.restore_stores();
        let restored_store = restored.get(&RepositoryId::from("repo-1")).unwrap();
        assert_eq!(restored_store.len(), 1);
        assert_eq!(restored_store.entries(&session.id).len(), 1);
    }

    #[tokio::test]
    async fn load_missing_file_returns_empty_state() {
        let dir = tempfile::tempdir().unwrap();
        let state = load(dir.path()).await.unwrap();
        assert!(state.agent_sessions.is_empty());
    }
}
