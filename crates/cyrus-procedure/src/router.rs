//! `determineRoutine`: resolves an issue/prompt to a `(Classification,
//! Procedure name, reasoning)` triple, honoring label overrides and the
//! control-mode suffix ahead of any classifier call (spec.md §4.5).

use cyrus_core::{Classification, LabelPrompts, Repository};

use crate::catalog::{apply_control_mode, default_procedure_name};
use crate::classify::{classify_with_fallback, ClassificationResult, Classifier};

/// The outcome of routing: which procedure was chosen and whether the
/// classifier was bypassed by a label override.
#[derive(Debug, Clone)]
pub struct RoutineDecision {
    pub classification: Classification,
    pub procedure_name: String,
    pub reasoning: String,
    pub bypassed_classifier: bool,
}

/// If the issue's labels map to a fixed Procedure in the repository's
/// `labelPrompts`, return that classification directly — the Router's
/// classifier is never called. When both `debugger` and `orchestrator`
/// labels are present, `debugger` takes precedence (Open Question in
/// spec.md §9, resolved here).
fn label_override(labels: &[String], label_prompts: &LabelPrompts) -> Option<(Classification, &'static str)> {
    if labels.iter().any(|l| l == "debugger") && label_prompts.debugger.is_some() {
        return Some((Classification::Debugger, "debugger"));
    }
    if labels.iter().any(|l| l == "orchestrator") && label_prompts.orchestrator.is_some() {
        return Some((Classification::Orchestrator, "orchestrator"));
    }
    None
}

/// Resolve the procedure to run for a new session. `text` is the issue
/// title+description or prompt body handed to the classifier if no label
/// override applies.
pub async fn determine_routine(
    classifier: &dyn Classifier,
    repository: &Repository,
    labels: &[String],
    text: &str,
    control_mode_enabled: bool,
) -> RoutineDecision {
    let (classification, reasoning, bypassed_classifier) =
        if let Some((classification, label)) = label_override(labels, &repository.label_prompts) {
            (
                classification,
                format!("Entering '{label}' mode because of the '{label}' label"),
                true,
            )
        } else {
            let ClassificationResult {
                classification,
                reasoning,
            } = classify_with_fallback(classifier, text).await;
            (classification, reasoning, false)
        };

    let procedure_name = default_procedure_name(classification).to_string();
    let procedure_name = if control_mode_enabled {
        apply_control_mode(&procedure_name)
    } else {
        procedure_name
    };

    RoutineDecision {
        classification,
        procedure_name,
        reasoning,
        bypassed_classifier,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::ClassificationResult as CR;
    use crate::error::ProcedureResult;
    use async_trait::async_trait;
    use cyrus_core::RepositoryId;
    use cyrus_core::WorkspaceId;

    struct AlwaysBuilder;

    #[async_trait]
    impl Classifier for AlwaysBuilder {
        async fn classify(&self, _text: &str) -> ProcedureResult<CR> {
            Ok(CR {
                classification: Classification::Builder,
                reasoning: "looks like feature work".into(),
            })
        }
    }

    fn repo_with_label_prompts(label_prompts: LabelPrompts) -> Repository {
        Repository {
            id: RepositoryId::from("r1"),
            name: "r1".into(),
            workspace_id: WorkspaceId::from("ws1"),
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
            append_instruction: None,
            mcp_config_path: None,
        }
    }

    #[tokio::test]
    async fn debugger_label_bypasses_classifier() {
        let repo = repo_with_label_prompts(LabelPrompts {
            debugger: Some("custom debugger prompt".into()),
            ..Default::default()
        });
        let decision = determine_routine(&AlwaysBuilder, &repo, &["debugger".to_string()], "text", false).await;
        assert!(decision.bypassed_classifier);
        assert_eq!(decision.classification, Classification::Debugger);
        assert_eq!(decision.procedure_name, "debugger-full");
    }

    #[tokio::test]
    async fn debugger_beats_orchestrator_when_both_labeled() {
        let repo = repo_with_label_prompts(LabelPrompts {
            debugger: Some("d".into()),
            orchestrator: Some("o".into()),
            ..Default::default()
        });
        let labels = vec!["debugger".to_string(), "orchestrator".to_string()];
        let decision = determine_routine(&AlwaysBuilder, &repo, &labels, "text", false).await;
        assert_eq!(decision.classification, Classification::Debugger);
    }

    #[tokio::test]
    async fn no_label_override_falls_through_to_classifier() {
        let repo = repo_with_label_prompts(LabelPrompts::default());
        let decision = determine_routine(&AlwaysBuilder, &repo, &[], "build me a feature", false).await;
        assert!(!decision.bypassed_classifier);
        assert_eq!(decision.classification, Classification::Builder);
        assert_eq!(decision.procedure_name, "builder-basic");
    }

    #[tokio::test]
    async fn control_mode_applies_suffix_to_classifier_result() {
        let repo = repo_with_label_prompts(LabelPrompts {
            debugger: Some("d".into()),
            ..Default::default()
        });
        let decision = determine_routine(&AlwaysBuilder, &repo, &["debugger".to_string()], "text", true).await;
        assert_eq!(decision.procedure_name, "debugger-full-controlled");
    }
}
