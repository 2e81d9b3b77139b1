//! Session Store (C4): durable `AgentSession` records and their entry logs,
//! keyed by repository (spec.md §4.4).

use cyrus_core::{AgentSession, AgentSessionEntry, IssueId, ProcedureMetadata, SessionId};
use dashmap::DashMap;
use std::sync::Arc;

/// In-memory durable store for one repository's sessions. Persistence to
/// disk is handled by `cyrus-persistence`, which serializes a snapshot of
/// this store and restores it into a fresh instance at startup.
#[derive(Default)]
pub struct SessionStore {
    sessions: DashMap<SessionId, AgentSession>,
    entries: DashMap<SessionId, Vec<AgentSessionEntry>>,
    by_issue: DashMap<IssueId, Vec<SessionId>>,
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, session_id: &SessionId) -> Option<AgentSession> {
        self.sessions.get(session_id).map(|r| r.clone())
    }

    /// All sessions recorded against `issue_id`, most-recently-created last.
    #[must_use]
    pub fn get_for_issue(&self, issue_id: &IssueId) -> Vec<AgentSession> {
        self.by_issue
            .get(issue_id)
            .map(|ids| ids.iter().filter_map(|id| self.get(id)).collect())
            .unwrap_or_default()
    }

    /// Insert or replace a session, indexing it under its issue.
    pub fn upsert(&self, session: AgentSession) {
        let issue_id = session.issue_id.clone();
        let session_id = session.id.clone();
        self.sessions.insert(session_id.clone(), session);
        let mut ids = self.by_issue.entry(issue_id).or_default();
        if !ids.contains(&session_id) {
            ids.push(session_id);
        }
    }

    pub fn append_entry(&self, session_id: &SessionId, entry: AgentSessionEntry) {
        self.entries.entry(session_id.clone()).or_default().push(entry);
        if let Some(mut session) = self.sessions.get_mut(session_id) {
            session.touch();
        }
    }

    #[must_use]
    pub fn entries(&self, session_id: &SessionId) -> Vec<AgentSessionEntry> {
        self.entries.get(session_id).map(|r| r.clone()).unwrap_or_default()
    }

    /// Replace a session's procedure metadata, bumping `updated_at`.
    pub fn set_procedure_metadata(&self, session_id: &SessionId, metadata: ProcedureMetadata) -> bool {
        match self.sessions.get_mut(session_id) {
            Some(mut session) => {
                session.metadata.procedure = Some(metadata);
                session.touch();
                true
            }
            None => false,
        }
    }

    pub fn mark_thread_reply_posted(&self, session_id: &SessionId) -> bool {
        match self.sessions.get_mut(session_id) {
            Some(mut session) => {
                session.metadata.thread_reply_posted = true;
                session.touch();
                true
            }
            None => false,
        }
    }

    /// Record the Tracker reaction id placed on the originating comment, so
    /// it can be cleared or swapped as the session progresses.
    pub fn set_reaction_id(&self, session_id: &SessionId, reaction_id: Option<cyrus_core::ReactionId>) -> bool {
        match self.sessions.get_mut(session_id) {
            Some(mut session) => {
                session.metadata.reaction_id = reaction_id;
                session.touch();
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Snapshot every session and its entries, for persistence.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(AgentSession, Vec<AgentSessionEntry>)> {
        self.sessions
            .iter()
            .map(|r| {
                let session = r.value().clone();
                let entries = self.entries(&session.id);
                (session, entries)
            })
            .collect()
    }

    /// Rebuild a store from a persisted snapshot.
    #[must_use]
    pub fn restore(snapshot: Vec<(AgentSession, Vec<AgentSessionEntry>)>) -> Arc<Self> {
        let store = Self::new();
        for (session, entries) in snapshot {
            let session_id = session.id.clone();
            store.upsert(session);
            store.entries.insert(session_id, entries);
        }
        Arc::new(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cyrus_core::{EntryType, IssueSnapshot, Workspace};

    fn sample_session(id: &str, issue: &str) -> AgentSession {
        AgentSession::new(
            SessionId::from(id),
            IssueId::from(issue),
            IssueSnapshot {
                id: IssueId::from(issue),
                identifier: issue.to_string(),
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

    #[test]
    fn upsert_then_get_round_trips() {
        let store = SessionStore::new();
        let session = sample_session("s1", "ENG-1");
        store.upsert(session.clone());
        assert_eq!(store.get(&session.id).unwrap().issue_id, session.issue_id);
    }

    #[test]
    fn get_for_issue_returns_every_session_on_that_issue() {
        let store = SessionStore::new();
        store.upsert(sample_session("s1", "ENG-1"));
        store.upsert(sample_session("s2", "ENG-1"));
        store.upsert(sample_session("s3", "ENG-2"));
        let sessions = store.get_for_issue(&IssueId::from("ENG-1"));
        assert_eq!(sessions.len(), 2);
    }

    #[test]
    fn append_entry_accumulates_and_touches_session() {
        let store = SessionStore::new();
        let session = sample_session("s1", "ENG-1");
        let original_updated_at = session.updated_at;
        store.upsert(session.clone());
        std::thread::sleep(std::time::Duration::from_millis(5));
        store.append_entry(&session.id, AgentSessionEntry::new(EntryType::User, "hello".into()));
        assert_eq!(store.entries(&session.id).len(), 1);
        assert!(store.get(&session.id).unwrap().updated_at > original_updated_at);
    }

    #[test]
    fn set_procedure_metadata_on_unknown_session_is_noop() {
        let store = SessionStore::new();
        assert!(!store.set_procedure_metadata(&SessionId::from("missing"), ProcedureMetadata::new("debugger".into())));
    }

    #[test]
    fn snapshot_round_trips_through_restore() {
        let store = SessionStore::new();
        let session = sample_session("s1", "ENG-1");
        store.upsert(session.clone());
        store.append_entry(&session.id, AgentSessionEntry::new(EntryType::User, "hi".into()));
        let snapshot = store.snapshot();
        let restored = SessionStore::restore(snapshot);
        assert_eq!(restored.len(), 1);
        assert_eq!(restored.entries(&session.id).len(), 1);
    }

    #[test]
    fn mark_thread_reply_posted_updates_metadata() {
        let store = SessionStore::new();
        let session = sample_session("s1", "ENG-1");
        store.upsert(session.clone());
        assert!(store.mark_thread_reply_posted(&session.id));
        assert!(store.get(&session.id).unwrap().metadata.thread_reply_posted);
    }
}
