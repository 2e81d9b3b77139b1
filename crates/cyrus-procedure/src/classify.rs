//! Classification: a short LLM call bucketing free text into a fixed
//! `Classification`, with a hard 30s timeout and a rule-based fallback
//! (spec.md §4.5). The call itself is a trait object so tests can swap in a
//! deterministic double instead of a real model.

use async_trait::async_trait;
use cyrus_core::Classification;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::error::{ProcedureError, ProcedureResult};

const CLASSIFICATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Result of a classification call: the bucket, the procedure reasoning
/// should pick (left to the caller to resolve via the catalog), and the
/// model's stated reasoning for logging.
#[derive(Debug, Clone)]
pub struct ClassificationResult {
    pub classification: Classification,
    pub reasoning: String,
}

#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, text: &str) -> ProcedureResult<ClassificationResult>;
}

/// One-shot, non-streaming classifier: spawns the same Assistant binary
/// used by `cyrus-assistant`, asks it a single classification question, and
/// parses one JSON line off stdout. Separate from `AssistantSupervisor`
/// because a classification call is not a session — it never streams, and
/// nothing about it is serialized per-session.
pub struct ProcessClassifier {
    program: String,
    args: Vec<String>,
}

impl ProcessClassifier {
    #[must_use]
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

#[derive(serde::Deserialize)]
struct ClassifyWireResult {
    classification: Classification,
    reasoning: String,
}

#[async_trait]
impl Classifier for ProcessClassifier {
    async fn classify(&self, text: &str) -> ProcedureResult<ClassificationResult> {
        let prompt = format!(
            "Classify the following issue or prompt as exactly one of debugger, orchestrator, builder, or scoper. \
             Respond with a single JSON object: {{\"classification\": \"...\", \"reasoning\": \"...\"}}.\n\n{text}"
        );

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| ProcedureError::Classifier(err.to_string()))?;

        let mut stdin = child.stdin.take().ok_or_else(|| ProcedureError::Classifier("classifier stdin unavailable".into()))?;
        stdin
            .write_all(prompt.as_bytes())
            .await
            .map_err(|err| ProcedureError::Classifier(err.to_string()))?;
        drop(stdin);

        let output = child.wait_with_output().await.map_err(|err| ProcedureError::Classifier(err.to_string()))?;
        if !output.status.success() {
            return Err(ProcedureError::Classifier(format!("classifier process exited with {}", output.status)));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let line = stdout.lines().rev().find(|l| !l.trim().is_empty()).unwrap_or_default();
        let parsed: ClassifyWireResult = serde_json::from_str(line).map_err(|err| ProcedureError::Classifier(err.to_string()))?;
        Ok(ClassificationResult {
            classification: parsed.classification,
            reasoning: parsed.reasoning,
        })
    }
}

/// Rule-based fallback used when the LLM classifier times out or errors.
/// Mirrors the "fall back to builder-basic" language in spec.md §4.5: this
/// always picks `Builder`, leaving the caller to route to `builder-basic`.
#[must_use]
pub fn fallback_classification(reason: &str) -> ClassificationResult {
    ClassificationResult {
        classification: Classification::Builder,
        reasoning: format!("classification unavailable ({reason}), defaulting to builder"),
    }
}

/// Run `classifier` against `text`, enforcing the 30s timeout and falling
/// back to the rule-based default on timeout or classifier error.
pub async fn classify_with_fallback(classifier: &dyn Classifier, text: &str) -> ClassificationResult {
    match tokio::time::timeout(CLASSIFICATION_TIMEOUT, classifier.classify(text)).await {
        Ok(Ok(result)) => result,
        Ok(Err(err)) => {
            tracing::warn!(error = %err, "classifier returned an error, falling back");
            fallback_classification(&err.to_string())
        }
        Err(_elapsed) => {
            tracing::warn!("classification call exceeded its 30s timeout, falling back");
            fallback_classification(&ProcedureError::ClassificationTimedOut.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct AlwaysDebugger;

    #[async_trait]
    impl Classifier for AlwaysDebugger {
        async fn classify(&self, _text: &str) -> ProcedureResult<ClassificationResult> {
            Ok(ClassificationResult {
                classification: Classification::Debugger,
                reasoning: "looks like a bug report".into(),
            })
        }
    }

    struct AlwaysErrors;

    #[async_trait]
    impl Classifier for AlwaysErrors {
        async fn classify(&self, _text: &str) -> ProcedureResult<ClassificationResult> {
            Err(ProcedureError::Classifier("model unavailable".into()))
        }
    }

    struct NeverResolves;

    #[async_trait]
    impl Classifier for NeverResolves {
        async fn classify(&self, _text: &str) -> ProcedureResult<ClassificationResult> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn successful_classification_is_returned_verbatim() {
        let result = classify_with_fallback(&AlwaysDebugger, "it crashes on startup").await;
        assert_eq!(result.classification, Classification::Debugger);
    }

    #[tokio::test]
    async fn classifier_error_falls_back_to_builder() {
        let result = classify_with_fallback(&AlwaysErrors, "anything").await;
        assert_eq!(result.classification, Classification::Builder);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_falls_back_to_builder() {
        let called = AtomicBool::new(false);
        let fut = classify_with_fallback(&NeverResolves, "anything");
        tokio::pin!(fut);
        tokio::time::advance(Duration::from_secs(31)).await;
        let result = fut.await;
        called.store(true, Ordering::SeqCst);
        assert!(called.load(Ordering::SeqCst));
        assert_eq!(result.classification, Classification::Builder);
    }
}
