//! Tool policy resolution (spec.md §4.7.6): priority chain over allowed and
//! disallowed tool lists, plus fixed presets and the MCP servers that are
//! always unioned in regardless of policy.

use cyrus_core::Repository;

/// Fixed tool presets a repository or global default can select.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolPreset {
    ReadOnly,
    Safe,
    All,
    Coordinator,
}

impl ToolPreset {
    #[must_use]
    pub fn resolve(self) -> Vec<String> {
        match self {
            Self::ReadOnly => vec!["read_file".into(), "list_directory".into(), "grep".into()],
            Self::Safe => vec![
                "read_file".into(),
                "list_directory".into(),
                "grep".into(),
                "write_file".into(),
                "run_tests".into(),
            ],
            Self::All => vec!["*".into()],
            Self::Coordinator => vec!["spawn_child_session".into(), "read_file".into(), "list_directory".into()],
        }
    }
}

/// MCP servers that are unioned into the tool list for every session,
/// regardless of policy: the Tracker integration and the in-process
/// "cyrus" server (parent/child session control).
const ALWAYS_ON_MCP_SERVERS: &[&str] = &["mcp__tracker", "mcp__cyrus"];

/// Global defaults, keyed by prompt type (subroutine `kind`), used when a
/// repository does not declare its own override for that type.
#[derive(Debug, Clone, Default)]
pub struct GlobalToolDefaults {
    pub by_prompt_type: std::collections::HashMap<String, (Vec<String>, Vec<String>)>,
    pub allowed: Vec<String>,
    pub disallowed: Vec<String>,
    pub safe_tools_fallback: ToolPresetOrEmpty,
}

#[derive(Debug, Clone, Copy, Default)]
pub enum ToolPresetOrEmpty {
    #[default]
    None,
    Preset(ToolPreset),
}

/// Resolve the allowed/disallowed tool lists for a session, following the
/// priority chain: (a) repository × promptType, (b) global defaults ×
/// promptType, (c) repository-wide, (d) global defaults, (e) safe-tools
/// fallback. MCP server tools are unioned in last, unconditionally.
#[must_use]
pub fn resolve(repository: &Repository, prompt_type: &str, defaults: &GlobalToolDefaults) -> (Vec<String>, Vec<String>) {
    let (mut allowed, mut disallowed) = if let Some((a, d)) = defaults.by_prompt_type.get(prompt_type) {
        (a.clone(), d.clone())
    } else if !repository.allowed_tools.is_empty() || !repository.disallowed_tools.is_empty() {
        (repository.allowed_tools.clone(), repository.disallowed_tools.clone())
    } else if !defaults.allowed.is_empty() || !defaults.disallowed.is_empty() {
        (defaults.allowed.clone(), defaults.disallowed.clone())
    } else if let ToolPresetOrEmpty::Preset(preset) = defaults.safe_tools_fallback {
        (preset.resolve(), Vec::new())
    } else {
        (ToolPreset::Safe.resolve(), Vec::new())
    };

    for server in ALWAYS_ON_MCP_SERVERS {
        if !allowed.iter().any(|t| t == server) {
            allowed.push((*server).to_string());
        }
    }
    disallowed.retain(|t| !ALWAYS_ON_MCP_SERVERS.contains(&t.as_str()));
    (allowed, disallowed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cyrus_core::{LabelPrompts, RepositoryId, WorkspaceId};

    fn repo() -> Repository {
        Repository {
            id: RepositoryId::from("r1"),
            name: "r1".into(),
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
            model: "m".into(),
            fallback_model: None,
            append_instruction: None,
            mcp_config_path: None,
        }
    }

    #[test]
    fn falls_back_to_safe_preset_when_nothing_else_configured() {
        let (allowed, _disallowed) = resolve(&repo(), "builder", &GlobalToolDefaults::default());
        assert!(allowed.contains(&"write_file".to_string()));
        assert!(allowed.contains(&"mcp__tracker".to_string()));
        assert!(allowed.contains(&"mcp__cyrus".to_string()));
    }

    #[test]
    fn repository_wide_allowlist_takes_priority_over_global_defaults() {
        let mut r = repo();
        r.allowed_tools = vec!["custom_tool".into()];
        let mut defaults = GlobalToolDefaults::default();
        defaults.allowed = vec!["other_tool".into()];
        let (allowed, _) = resolve(&r, "builder", &defaults);
        assert!(allowed.contains(&"custom_tool".to_string()));
        assert!(!allowed.contains(&"other_tool".to_string()));
    }

    #[test]
    fn prompt_type_override_wins_over_everything() {
        let mut r = repo();
        r.allowed_tools = vec!["repo_tool".into()];
        let mut defaults = GlobalToolDefaults::default();
        defaults
            .by_prompt_type
            .insert("debugger".into(), (vec!["debug_only_tool".into()], Vec::new()));
        let (allowed, _) = resolve(&r, "debugger", &defaults);
        assert!(allowed.contains(&"debug_only_tool".to_string()));
        assert!(!allowed.contains(&"repo_tool".to_string()));
    }

    #[test]
    fn mcp_servers_are_never_disallowed() {
        let mut r = repo();
        r.disallowed_tools = vec!["mcp__tracker".into()];
        let (_, disallowed) = resolve(&r, "builder", &GlobalToolDefaults::default());
        assert!(!disallowed.contains(&"mcp__tracker".to_string()));
    }
}
