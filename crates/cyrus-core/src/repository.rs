//! Repository: a local codebase + its Tracker routing + its prompt and tool policy.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::ids::{RepositoryId, WorkspaceId};

/// Per-label system prompt overrides (debugger / builder / scoper / orchestrator).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LabelPrompts {
    pub debugger: Option<String>,
    pub builder: Option<String>,
    pub scoper: Option<String>,
    pub orchestrator: Option<String>,
}

/// An immutable (for the duration of a session) configuration record describing
/// one repository Cyrus can work against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    pub id: RepositoryId,
    pub name: String,
    pub workspace_id: WorkspaceId,
    pub tracker_token: String,
    #[serde(default)]
    pub team_keys: Vec<String>,
    #[serde(default)]
    pub routing_labels: Vec<String>,
    #[serde(default)]
    pub project_keys: Vec<String>,
    pub repository_path: PathBuf,
    pub workspace_base_dir: PathBuf,
    pub base_branch: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub label_prompts: LabelPrompts,
    #[serde(default)]
    pub allowed_tools: Vec<String>,
    #[serde(default)]
    pub disallowed_tools: Vec<String>,
    pub model: String,
    #[serde(default)]
    pub fallback_model: Option<String>,
    #[serde(default)]
    pub append_instruction: Option<String>,
    #[serde(default)]
    pub mcp_config_path: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

/// A named, hot-reloadable set of repositories, keyed by `RepositoryId`.
#[derive(Debug, Clone, Default)]
pub struct RepositorySet {
    by_id: HashMap<RepositoryId, Repository>,
}

impl RepositorySet {
    #[must_use]
    pub fn new(repositories: Vec<Repository>) -> Self {
        Self {
            by_id: repositories.into_iter().map(|r| (r.id.clone(), r)).collect(),
        }
    }

    #[must_use]
    pub fn get(&self, id: &RepositoryId) -> Option<&Repository> {
        self.by_id.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Repository> {
        self.by_id.values()
    }

    /// All repositories that share the given Tracker token.
    pub fn for_token<'a>(&'a self, token: &'a str) -> impl Iterator<Item = &'a Repository> {
        self.by_id.values().filter(move |r| r.tracker_token == token)
    }

    /// All repositories in the given workspace.
    pub fn for_workspace<'a>(
        &'a self,
        workspace_id: &'a WorkspaceId,
    ) -> impl Iterator<Item = &'a Repository> {
        self.by_id.values().filter(move |r| &r.workspace_id == workspace_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
