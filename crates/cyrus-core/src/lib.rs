//! Shared domain types for the Cyrus agent-session orchestrator: the
//! `Repository`, `AgentSession`, `AgentSessionEntry`, and `Procedure`/
//! `Subroutine` records every other crate in the workspace builds on.

pub mod entry;
pub mod error;
pub mod event;
pub mod ids;
pub mod procedure;
pub mod repository;
pub mod session;

pub use entry::{AgentSessionEntry, EntryType};
pub use error::{CoreError, CoreResult};
pub use event::{CommentRef, Event, FieldChange};
pub use ids::{CommentId, IssueId, ReactionId, RepositoryId, SessionId, TeamId, UserId, WorkspaceId};
pub use procedure::{Classification, Procedure, ProcedureMetadata, Subroutine, SubroutineHistoryEntry};
pub use repository::{LabelPrompts, Repository, RepositorySet};
pub use session::{
    AgentSession, IssueChangeRecord, IssueSnapshot, SessionMetadata, SessionStatus, Workspace,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_reply_metadata_requires_original_comment() {
        let mut metadata = SessionMetadata::default();
        assert!(metadata.is_valid());
        metadata.should_reply_in_thread = true;
        assert!(!metadata.is_valid());
        metadata.original_comment_id = Some(CommentId::from("c1"));
        assert!(metadata.is_valid());
    }

    #[test]
    fn procedure_index_only_advances() {
        let mut meta = ProcedureMetadata::new("builder-basic");
        assert_eq!(meta.current_index, 0);
        let sub = Subroutine {
            name: "scope".into(),
            description: "scope the issue".into(),
            prompt_path: "prompts/scope.md".into(),
            max_turns: 10,
            kind: "scope".into(),
        };
        meta.advance(&sub);
        assert_eq!(meta.current_index, 1);
        assert_eq!(meta.subroutine_history.len(), 1);
    }

    #[test]
    fn session_round_trips_through_json() {
        let session = AgentSession::new(
            SessionId::from("s1"),
            IssueId::from("ENG-1"),
            IssueSnapshot {
                id: IssueId::from("ENG-1"),
                identifier: "ENG-1".into(),
                title: "Fix bug".into(),
                description: String::new(),
                branch_name: "eng-1".into(),
            },
            Workspace {
                path: "/tmp/ws".into(),
                is_git_worktree: true,
            },
        );
        let json = serde_json::to_string(&session).unwrap();
        let restored: AgentSession = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.id, session.id);
        assert_eq!(restored.status, SessionStatus::Pending);
    }
}
