//! `notify`-based hot-reload watcher with a write-stability debounce,
//! grounded on the teacher's `notify = "7"` dependency (declared for its own
//! config hot-reload in `astrid-gateway`) plus its layered-load pattern in
//! `astrid-config::loader`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use cyrus_core::{Repository, RepositoryId};
use notify::{Event as NotifyEvent, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::error::ConfigResult;
use crate::loader;

/// Write-stability debounce: a burst of filesystem events collapses into a
/// single reload this long after the last event.
const DEBOUNCE: Duration = Duration::from_millis(500);

/// The result of diffing a freshly-loaded repository set against the
/// previous one, by `id` (spec.md §4.8).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositorySetDiff {
    pub added: Vec<RepositoryId>,
    pub modified: Vec<RepositoryId>,
    pub removed: Vec<RepositoryId>,
}

impl RepositorySetDiff {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.removed.is_empty()
    }
}

/// Diff two repository sets by id. A repository counts as `modified` if its
/// serialized form changed at all (token rotation included — callers decide
/// what a token change implies).
#[must_use]
pub fn diff(previous: &[Repository], current: &[Repository]) -> RepositorySetDiff {
    use std::collections::HashMap;

    let previous_by_id: HashMap<_, _> = previous.iter().map(|r| (r.id.clone(), r)).collect();
    let current_by_id: HashMap<_, _> = current.iter().map(|r| (r.id.clone(), r)).collect();

    let mut result = RepositorySetDiff::default();
    for (id, repo) in &current_by_id {
        match previous_by_id.get(id) {
            None => result.added.push(id.clone()),
            Some(prev) => {
                if serde_json::to_string(prev).ok() != serde_json::to_string(repo).ok() {
                    result.modified.push(id.clone());
                }
            }
        }
    }
    for id in previous_by_id.keys() {
        if !current_by_id.contains_key(id) {
            result.removed.push(id.clone());
        }
    }
    result
}

/// Watch `path` for changes, emitting a freshly-loaded, validated
/// repository set on the returned channel after each debounced write.
/// Malformed reloads are logged and skipped — the previous repository set
/// stays in effect.
pub fn watch(path: PathBuf) -> ConfigResult<(RecommendedWatcher, mpsc::Receiver<Vec<Repository>>)> {
    let (raw_tx, mut raw_rx) = mpsc::channel::<notify::Result<NotifyEvent>>(16);
    let (reload_tx, reload_rx) = mpsc::channel::<Vec<Repository>>(4);

    let mut watcher = notify::recommended_watcher(move |res| {
        let _ = raw_tx.blocking_send(res);
    })?;
    watcher.watch(
        path.parent().unwrap_or_else(|| Path::new(".")),
        RecursiveMode::NonRecursive,
    )?;

    tokio::spawn(async move {
        loop {
            let Some(first) = raw_rx.recv().await else {
                break;
            };
            if first.is_err() {
                continue;
            }
            // Coalesce any further events arriving within the debounce window.
            let _ = tokio::time::timeout(DEBOUNCE, drain(&mut raw_rx)).await;

            match loader::load(&path).await {
                Ok(repositories) => {
                    if reload_tx.send(repositories).await.is_err() {
                        break;
                    }
                }
                Err(err) => {
                    tracing::warn!(error = %err, "config reload failed, keeping previous repository set");
                }
            }
        }
    });

    Ok((watcher, reload_rx))
}

async fn drain(rx: &mut mpsc::Receiver<notify::Result<NotifyEvent>>) {
    while rx.recv().await.is_some() {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use cyrus_core::{LabelPrompts, WorkspaceId};

    fn repo(id: &str, model: &str) -> Repository {
        Repository {
            id: RepositoryId::from(id),
            name: id.to_string(),
            workspace_id: WorkspaceId::from("ws"),
            tracker_token: "tok".into(),
            team_keys: Vec::new(),
            routing_labels: Vec::new(),
            project_keys: Vec::new(),
            repository_path: "/repo".into(),
            workspace_base_dir: "/ws".into(),
            base_branch: "main".into(),
            is_active: true,
            label_prompts: LabelPrompts::default(),
            allowed_tools: Vec::new(),
            disallowed_tools: Vec::new(),
            model: model.into(),
            fallback_model: None,
            append_instruction: None,
            mcp_config_path: None,
        }
    }

    #[test]
    fn detects_added_modified_and_removed() {
        let previous = vec![repo("a", "claude-1"), repo("b", "claude-1")];
        let current = vec![repo("a", "claude-2"), repo("c", "claude-1")];
        let d = diff(&previous, &current);
        assert_eq!(d.added, vec![RepositoryId::from("c")]);
        assert_eq!(d.modified, vec![RepositoryId::from("a")]);
        assert_eq!(d.removed, vec![RepositoryId::from("b")]);
    }

    #[test]
    fn identical_sets_produce_an_empty_diff() {
        let repos = vec![repo("a", "claude-1")];
        assert!(diff(&repos, &repos.clone()).is_empty());
    }
}
