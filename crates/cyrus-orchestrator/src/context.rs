//! `OrchestratorContext`: the shared, per-repository-token set of
//! collaborators a handler needs. Grounded on
//! `astrid-gateway::server::inbound_router`'s split between a thin shared
//! context and free functions that operate on it, rather than one large
//! god-object with every method on it.

use std::collections::HashMap;
use std::sync::Arc;

use cyrus_assistant::AssistantSupervisor;
use cyrus_core::{Repository, RepositoryId, SessionId};
use cyrus_procedure::Classifier;
use cyrus_session::{SessionIndex, SessionStore};
use cyrus_tracker::TrackerClient;
use dashmap::DashMap;

use crate::tool_policy::GlobalToolDefaults;

/// Everything a handler needs to act on one repository's sessions. Built
/// once per repository by the daemon at startup/config-reload and handed
/// to each handler call.
pub struct OrchestratorContext {
    pub repository: Repository,
    pub store: Arc<SessionStore>,
    pub index: Arc<SessionIndex>,
    pub tracker: Arc<TrackerClient>,
    pub classifier: Arc<dyn Classifier>,
    pub assistants: Arc<DashMap<SessionId, Arc<AssistantSupervisor>>>,
    pub assistant_program: (String, Vec<String>),
    pub tool_defaults: GlobalToolDefaults,
    pub control_mode_enabled: bool,
    /// Every repository's store, so parent/child resumption can find a
    /// parent session that lives in a different repository (spec.md
    /// §4.7.9: "looking in any repository").
    pub all_stores: Arc<HashMap<RepositoryId, Arc<SessionStore>>>,
}

impl OrchestratorContext {
    /// The supervisor for `session_id`, creating one if none exists yet.
    pub fn assistant_for(&self, session_id: &SessionId) -> Arc<AssistantSupervisor> {
        self.assistants
            .entry(session_id.clone())
            .or_insert_with(|| Arc::new(AssistantSupervisor::new(self.assistant_program.0.clone(), self.assistant_program.1.clone())))
            .clone()
    }

    /// Find the store holding `session_id`, searching every repository.
    #[must_use]
    pub fn find_store_for_session(&self, session_id: &SessionId) -> Option<Arc<SessionStore>> {
        if self.store.get(session_id).is_some() {
            return Some(Arc::clone(&self.store));
        }
        self.all_stores
            .values()
            .find(|store| store.get(session_id).is_some())
            .cloned()
    }
}
