//! Prompt templating (spec.md §4.7.1 steps 6-7, §4.7.7, §4.5): templates are
//! data, not code — these functions only select and substitute, they never
//! render a template engine's control flow.

use std::sync::LazyLock;

use cyrus_core::{Classification, IssueSnapshot, LabelPrompts, Repository};
use cyrus_tracker::Comment;
use regex::Regex;

static VERSION_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<version-tag\s+value="([^"]+)"\s*/>"#).expect("static regex is valid"));

/// Synthetic marker placed in an initial comment to signal a delegated
/// session (spec.md §4.7.1 step 6).
pub const DELEGATION_MARKER: &str = "This thread is for an agent session";
/// Explicit command requesting label-based system-prompt selection.
pub const LABEL_BASED_PROMPT_COMMAND: &str = "/label-based-prompt";
const MENTION_TOKENS: &[&str] = &["@cyrus", "@bot"];

/// Whether `should_select_system_prompt_by_label` would select a label
/// based on this comment body (delegation marker or explicit command).
#[must_use]
fn is_delegation_or_label_command(body: &str) -> bool {
    body.contains(DELEGATION_MARKER) || body.contains(LABEL_BASED_PROMPT_COMMAND)
}

/// spec.md §4.7.1 step 6: select the system prompt by label only for
/// delegated sessions or an explicit `/label-based-prompt` command; for
/// @mention events (or no originating comment at all) the system prompt is
/// omitted entirely.
#[must_use]
pub fn should_select_system_prompt_by_label(originating_comment_body: Option<&str>) -> bool {
    originating_comment_body.is_some_and(is_delegation_or_label_command)
}

/// Which initial-prompt template applies (spec.md §4.7.1 step 7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitialPromptTemplate {
    Mention,
    LabelBased,
    V2,
    Fallback,
}

/// Pick the initial-prompt template for this session. `Fallback` is never
/// chosen here — callers force it when gathering the template's inputs
/// itself failed (spec.md §7 item 7: "falls back to a short synthetic
/// prompt string, never panics").
#[must_use]
pub fn select_initial_prompt_template(originating_comment_body: Option<&str>) -> InitialPromptTemplate {
    match originating_comment_body {
        Some(body) if is_delegation_or_label_command(body) => InitialPromptTemplate::LabelBased,
        Some(body) if MENTION_TOKENS.iter().any(|token| body.contains(token)) => InitialPromptTemplate::Mention,
        _ => InitialPromptTemplate::V2,
    }
}

const MENTION_TEMPLATE: &str = "You were mentioned in a comment on {{repository_name}} issue {{issue_identifier}}: \"{{issue_title}}\".\n\n{{issue_description}}\n\nBase branch: {{base_branch}}\n\nThread so far:\n{{comment_threads}}\n\nNew comment from {{new_comment_author}}:\n{{new_comment_body}}";
const LABEL_BASED_TEMPLATE: &str =
    "You are picking up {{repository_name}} issue {{issue_identifier}}: \"{{issue_title}}\".\n\n{{issue_description}}\n\nBase branch: {{base_branch}}\nWorkspace teams: {{workspace_teams}}\nWorkspace labels: {{workspace_labels}}";
const V2_TEMPLATE: &str = "Work on {{repository_name}} issue {{issue_identifier}}: \"{{issue_title}}\".\n\n{{issue_description}}\n\nBase branch: {{base_branch}}";
const FALLBACK_TEMPLATE: &str = "Work on {{repository_name}} issue {{issue_identifier}}.";

/// The substitution inputs for an initial prompt (spec.md §4.7.1 step 7's
/// `{{repository_name}}`, `{{issue_*}}`, `{{base_branch}}`,
/// `{{comment_threads}}`, `{{new_comment_*}}`, workspace teams/labels).
pub struct InitialPromptInputs<'a> {
    pub repository: &'a Repository,
    pub issue: &'a IssueSnapshot,
    pub base_branch: &'a str,
    pub comment_threads: &'a str,
    pub new_comment_body: Option<&'a str>,
    pub new_comment_author: Option<&'a str>,
    pub is_thread_reply: bool,
}

fn substitute_placeholders(template: &str, inputs: &InitialPromptInputs<'_>) -> String {
    template
        .replace("{{repository_name}}", &inputs.repository.name)
        .replace("{{issue_identifier}}", &inputs.issue.identifier)
        .replace("{{issue_title}}", &inputs.issue.title)
        .replace("{{issue_description}}", &inputs.issue.description)
        .replace("{{base_branch}}", inputs.base_branch)
        .replace("{{comment_threads}}", inputs.comment_threads)
        .replace("{{new_comment_body}}", inputs.new_comment_body.unwrap_or_default())
        .replace("{{new_comment_author}}", inputs.new_comment_author.unwrap_or_default())
        .replace("{{workspace_teams}}", &inputs.repository.team_keys.join(", "))
        .replace("{{workspace_labels}}", &inputs.repository.routing_labels.join(", "))
}

/// Render the chosen template against `inputs`, append `agent_guidance`
/// (the first Subroutine's own instructions) as a trailing block if
/// present, and append a `<thread-reply-mode>` directive when the session
/// is anchored to a thread reply (spec.md §4.7.1 step 7).
#[must_use]
pub fn build_initial_prompt(inputs: &InitialPromptInputs<'_>, template: InitialPromptTemplate, agent_guidance: &str) -> String {
    let template_body = match template {
        InitialPromptTemplate::Mention => MENTION_TEMPLATE,
        InitialPromptTemplate::LabelBased => LABEL_BASED_TEMPLATE,
        InitialPromptTemplate::V2 => V2_TEMPLATE,
        InitialPromptTemplate::Fallback => FALLBACK_TEMPLATE,
    };
    let mut prompt = substitute_placeholders(template_body, inputs);
    if !agent_guidance.trim().is_empty() {
        prompt = format!("{prompt}\n\n---\n{agent_guidance}");
    }
    if inputs.is_thread_reply {
        prompt.push_str(
            "\n\n<thread-reply-mode>This session replies in an existing thread. Do not create a new top-level comment via MCP.</thread-reply-mode>",
        );
    }
    prompt
}

/// Render each comment as `author: body`, newline-joined, for the
/// `{{comment_threads}}` placeholder.
#[must_use]
pub fn format_comment_threads(comments: &[Comment]) -> String {
    comments.iter().map(|c| format!("{}: {}", c.author_user_id, c.body)).collect::<Vec<_>>().join("\n")
}

/// Pick the repository's label-specific system prompt override for
/// `classification`, if one is configured.
#[must_use]
pub fn label_prompt_for<'a>(label_prompts: &'a LabelPrompts, classification: Classification) -> Option<&'a str> {
    match classification {
        Classification::Debugger => label_prompts.debugger.as_deref(),
        Classification::Builder => label_prompts.builder.as_deref(),
        Classification::Scoper => label_prompts.scoper.as_deref(),
        Classification::Orchestrator => label_prompts.orchestrator.as_deref(),
    }
}

/// Build the full system prompt for a session: the label override (or a
/// generic fallback naming the classification), plus the repository's
/// `appendInstruction` if configured.
#[must_use]
pub fn build_system_prompt(repository: &Repository, classification: Classification) -> String {
    let base = label_prompt_for(&repository.label_prompts, classification)
        .map(str::to_string)
        .unwrap_or_else(|| format!("You are operating in {} mode.", classification.as_str()));
    match &repository.append_instruction {
        Some(extra) if !extra.trim().is_empty() => format!("{base}\n\n{extra}"),
        _ => base,
    }
}

/// Extract a `<version-tag value="…"/>` from a label-selected prompt, if
/// present (spec.md §4.5: "extract its `<version-tag value=\"…\"/>`").
#[must_use]
pub fn extract_version_tag(prompt: &str) -> Option<String> {
    VERSION_TAG.captures(prompt).and_then(|c| c.get(1)).map(|m| m.as_str().to_string())
}

/// Append the stored response template to a subroutine's prompt body, if
/// one was selected by an earlier `select-template` subroutine.
#[must_use]
pub fn with_response_template(prompt_body: &str, response_template: Option<&str>) -> String {
    match response_template {
        Some(template) if !template.trim().is_empty() => format!("{prompt_body}\n\n---\nResponse template:\n{template}"),
        _ => prompt_body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cyrus_core::{RepositoryId, WorkspaceId};

    fn repo(label_prompts: LabelPrompts, append: Option<&str>) -> Repository {
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
            label_prompts,
            allowed_tools: Vec::new(),
            disallowed_tools: Vec::new(),
            model: "m".into(),
            fallback_model: None,
            append_instruction: append.map(str::to_string),
            mcp_config_path: None,
        }
    }

    #[test]
    fn uses_label_override_when_present() {
        let repo = repo(
            LabelPrompts {
                debugger: Some("Debug mode prompt".into()),
                ..Default::default()
            },
            None,
        );
        assert_eq!(build_system_prompt(&repo, Classification::Debugger), "Debug mode prompt");
    }

    #[test]
    fn falls_back_to_generic_prompt_without_override() {
        let repo = repo(LabelPrompts::default(), None);
        assert_eq!(build_system_prompt(&repo, Classification::Builder), "You are operating in builder mode.");
    }

    #[test]
    fn appends_instruction_when_configured() {
        let repo = repo(LabelPrompts::default(), Some("Always run the linter."));
        assert!(build_system_prompt(&repo, Classification::Builder).ends_with("Always run the linter."));
    }

    #[test]
    fn extracts_version_tag_from_prompt_body() {
        let prompt = r#"Some prompt text <version-tag value="v3"/> more text"#;
        assert_eq!(extract_version_tag(prompt), Some("v3".to_string()));
    }

    #[test]
    fn missing_version_tag_yields_none() {
        assert_eq!(extract_version_tag("plain prompt"), None);
    }

    #[test]
    fn response_template_is_appended_when_present() {
        let result = with_response_template("do the thing", Some("## Summary"));
        assert!(result.contains("## Summary"));
    }

    #[test]
    fn absent_response_template_leaves_body_unchanged() {
        assert_eq!(with_response_template("do the thing", None), "do the thing");
    }

    fn issue() -> IssueSnapshot {
        IssueSnapshot {
            id: cyrus_core::IssueId::from("i1"),
            identifier: "ENG-1".into(),
            title: "Fix the thing".into(),
            description: "It is broken.".into(),
            branch_name: "eng-1".into(),
        }
    }

    #[test]
    fn delegation_marker_selects_label_based_template_and_system_prompt() {
        let body = "This thread is for an agent session";
        assert!(should_select_system_prompt_by_label(Some(body)));
        assert_eq!(select_initial_prompt_template(Some(body)), InitialPromptTemplate::LabelBased);
    }

    #[test]
    fn label_based_prompt_command_selects_label_based_template() {
        let body = "/label-based-prompt debugger";
        assert!(should_select_system_prompt_by_label(Some(body)));
        assert_eq!(select_initial_prompt_template(Some(body)), InitialPromptTemplate::LabelBased);
    }

    #[test]
    fn plain_mention_omits_system_prompt_but_selects_mention_template() {
        let body = "@cyrus please take a look";
        assert!(!should_select_system_prompt_by_label(Some(body)));
        assert_eq!(select_initial_prompt_template(Some(body)), InitialPromptTemplate::Mention);
    }

    #[test]
    fn no_originating_comment_selects_v2_template_and_omits_system_prompt() {
        assert!(!should_select_system_prompt_by_label(None));
        assert_eq!(select_initial_prompt_template(None), InitialPromptTemplate::V2);
    }

    #[test]
    fn initial_prompt_substitutes_placeholders_and_appends_guidance() {
        let repo = repo(LabelPrompts::default(), None);
        let issue = issue();
        let inputs = InitialPromptInputs {
            repository: &repo,
            issue: &issue,
            base_branch: "main",
            comment_threads: "",
            new_comment_body: None,
            new_comment_author: None,
            is_thread_reply: false,
        };
        let prompt = build_initial_prompt(&inputs, InitialPromptTemplate::V2, "Reproduce the bug first.");
        assert!(prompt.contains("ENG-1"));
        assert!(prompt.contains("Fix the thing"));
        assert!(prompt.contains("main"));
        assert!(prompt.contains("Reproduce the bug first."));
    }

    #[test]
    fn thread_reply_prompt_appends_thread_reply_mode_directive() {
        let repo = repo(LabelPrompts::default(), None);
        let issue = issue();
        let inputs = InitialPromptInputs {
            repository: &repo,
            issue: &issue,
            base_branch: "main",
            comment_threads: "",
            new_comment_body: None,
            new_comment_author: None,
            is_thread_reply: true,
        };
        let prompt = build_initial_prompt(&inputs, InitialPromptTemplate::Mention, "");
        assert!(prompt.contains("<thread-reply-mode>"));
    }

    #[test]
    fn comment_threads_are_rendered_author_colon_body() {
        let comments = vec![Comment {
            id: cyrus_core::CommentId::from("c1"),
            issue_id: cyrus_core::IssueId::from("i1"),
            body: "looks good".into(),
            author_user_id: "alice".into(),
            parent_id: None,
        }];
        assert_eq!(format_comment_threads(&comments), "alice: looks good");
    }
}
