//! `AppState`: every live collaborator the daemon wires together, plus the
//! (re)build logic that applies a freshly-loaded repository set (spec.md
//! §4.8's Added/Modified/Removed reload semantics).

use std::collections::HashMap;
use std::sync::Arc;

use cyrus_core::{Repository, RepositoryId, RepositorySet};
use cyrus_orchestrator::OrchestratorContext;
use cyrus_orchestrator::tool_policy::GlobalToolDefaults;
use cyrus_procedure::{Classifier, ProcessClassifier};
use cyrus_session::{SessionIndex, SessionStore, WebhookDeduplicator};
use cyrus_tracker::TrackerClient;
use dashmap::DashMap;

use crate::config::Args;

/// Everything the dispatch loop and the shutdown sequence need, built once
/// at startup and partially rebuilt on every config reload.
pub struct AppState {
    pub args: Args,
    pub classifier: Arc<dyn Classifier>,
    pub trackers: DashMap<String, Arc<TrackerClient>>,
    pub stores: DashMap<RepositoryId, Arc<SessionStore>>,
    pub indexes: DashMap<RepositoryId, Arc<SessionIndex>>,
    pub dedup: DashMap<String, Arc<WebhookDeduplicator>>,
    pub contexts: DashMap<RepositoryId, Arc<OrchestratorContext>>,
    pub repositories: std::sync::RwLock<RepositorySet>,
}

impl AppState {
    /// Build a fresh `AppState` with no repositories loaded yet. Restored
    /// session state, if any, is merged in by `reload`.
    #[must_use]
    pub fn new(args: Args) -> Self {
        let classifier: Arc<dyn Classifier> = Arc::new(ProcessClassifier::new(args.classifier_program(), Vec::new()));
        Self {
            args,
            classifier,
            trackers: DashMap::new(),
            stores: DashMap::new(),
            indexes: DashMap::new(),
            dedup: DashMap::new(),
            contexts: DashMap::new(),
            repositories: std::sync::RwLock::new(RepositorySet::default()),
        }
    }

    /// Seed session stores restored from disk, before the first reload.
    pub fn restore_stores(&self, restored: HashMap<RepositoryId, Arc<SessionStore>>) {
        for (repo_id, store) in restored {
            self.stores.insert(repo_id, store);
        }
    }

    #[must_use]
    pub fn tracker_for(&self, token: &str) -> Arc<TrackerClient> {
        self.trackers
            .entry(token.to_string())
            .or_insert_with(|| Arc::new(TrackerClient::new(self.args.base_url.clone(), token.to_string(), self.args.bot_user_id.clone())))
            .clone()
    }

    #[must_use]
    pub fn dedup_for(&self, token: &str) -> Arc<WebhookDeduplicator> {
        self.dedup
            .entry(token.to_string())
            .or_insert_with(|| Arc::new(WebhookDeduplicator::default()))
            .clone()
    }

    /// Apply a freshly-loaded, validated repository set: create contexts for
    /// new repositories, refresh contexts for modified ones, and tear down
    /// removed ones (spec.md §4.8). Returns the tracker tokens that no
    /// longer have any repository using them, so the caller can tear down
    /// their transport too (spec.md §8 scenario #6).
    pub async fn reload(&self, repositories: Vec<Repository>) -> Vec<String> {
        let previous: Vec<Repository> = self
            .repositories
            .read()
            .expect("repositories lock poisoned")
            .iter()
            .cloned()
            .collect();
        let diff = cyrus_config::diff(&previous, &repositories);
        let new_set = RepositorySet::new(repositories);

        let mut orphaned_tokens = Vec::new();
        for repo_id in &diff.removed {
            self.teardown_repository(repo_id).await;

            let Some(removed_repo) = previous.iter().find(|r| &r.id == repo_id) else { continue };
            if new_set.for_token(&removed_repo.tracker_token).next().is_none() {
                self.trackers.remove(&removed_repo.tracker_token);
                self.dedup.remove(&removed_repo.tracker_token);
                orphaned_tokens.push(removed_repo.tracker_token.clone());
            }
        }

        for repo in new_set.iter() {
            if diff.removed.contains(&repo.id) {
                continue;
            }
            self.ensure_repository(repo);
        }

        self.rebuild_contexts(&new_set);
        *self.repositories.write().expect("repositories lock poisoned") = new_set;
        orphaned_tokens
    }

    fn ensure_repository(&self, repo: &Repository) {
        self.stores.entry(repo.id.clone()).or_insert_with(|| Arc::new(SessionStore::new()));
        self.indexes.entry(repo.id.clone()).or_insert_with(|| {
            let index = Arc::new(SessionIndex::new());
            index.start();
            index
        });
        self.tracker_for(&repo.tracker_token);
        self.dedup_for(&repo.tracker_token);
    }

    async fn teardown_repository(&self, repo_id: &RepositoryId) {
        if let Some((_, ctx)) = self.contexts.remove(repo_id) {
            let sessions: Vec<_> = ctx.assistants.iter().map(|e| (e.key().clone(), e.value().clone())).collect();
            for (session_id, assistant) in sessions {
                assistant.stop().await;
                let _ = ctx
                    .tracker
                    .create_agent_activity(&session_id, cyrus_tracker::ActivityType::Response, "This repository was removed from configuration; stopping work.")
                    .await;
                tracing::info!(repository = %repo_id, session_id = %session_id, "notified session of repository removal");
            }
        }
        if let Some((_, index)) = self.indexes.remove(repo_id) {
            index.shutdown();
        }
        self.stores.remove(repo_id);
    }

    /// Rebuild every live `OrchestratorContext` against the current store
    /// map, so `all_stores` stays consistent across a reload.
    fn rebuild_contexts(&self, repositories: &RepositorySet) {
        let all_stores: HashMap<RepositoryId, Arc<SessionStore>> =
            self.stores.iter().map(|entry| (entry.key().clone(), entry.value().clone())).collect();
        let all_stores = Arc::new(all_stores);

        for repo in repositories.iter() {
            let Some(store) = self.stores.get(&repo.id).map(|e| e.value().clone()) else { continue };
            let Some(index) = self.indexes.get(&repo.id).map(|e| e.value().clone()) else { continue };

            let existing_assistants = self.contexts.get(&repo.id).map(|e| e.value().assistants.clone());

            let ctx = Arc::new(OrchestratorContext {
                repository: repo.clone(),
                store,
                index,
                tracker: self.tracker_for(&repo.tracker_token),
                classifier: Arc::clone(&self.classifier),
                assistants: existing_assistants.unwrap_or_default(),
                assistant_program: (self.args.assistant_program.clone(), Vec::new()),
                tool_defaults: GlobalToolDefaults::default(),
                control_mode_enabled: self.args.control_mode,
                all_stores: Arc::clone(&all_stores),
            });
            self.contexts.insert(repo.id.clone(), ctx);
        }
    }

    #[must_use]
    pub fn context_for(&self, repo_id: &RepositoryId) -> Option<Arc<OrchestratorContext>> {
        self.contexts.get(repo_id).map(|e| e.value().clone())
    }

    #[must_use]
    pub fn snapshot_stores(&self) -> HashMap<RepositoryId, Arc<SessionStore>> {
        self.stores.iter().map(|entry| (entry.key().clone(), entry.value().clone())).collect()
    }

    /// Stop every Assistant and every `SessionIndex` sweeper across all
    /// repositories. The config watcher and transports are stopped by the
    /// caller before this runs (spec.md §5's dependency-ordered teardown).
    pub async fn shutdown_all(&self) {
        let assistants: Vec<_> = self
            .contexts
            .iter()
            .flat_map(|ctx| ctx.value().assistants.iter().map(|e| e.value().clone()).collect::<Vec<_>>())
            .collect();
        for assistant in assistants {
            assistant.stop().await;
        }
        for entry in self.indexes.iter() {
            entry.value().shutdown();
        }
    }
}
