//! `AssistantSupervisor`: owns one Assistant child process for one session.
//! `start → addStreamMessage* → stop` is strictly serialized by a
//! `tokio::sync::Mutex`, grounded on the teacher's per-session
//! `Arc<Mutex<..>>` + stored `JoinHandle` shape (`astrid-gateway::SessionHandle`).

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::error::{AssistantError, AssistantResult};
use crate::protocol::{InboundMessage, OutboundMessage};

struct StreamHandle {
    child: Child,
    stdin: ChildStdin,
    reader: JoinHandle<()>,
}

/// Parameters for starting (or resuming) a stream.
pub struct StartParams {
    pub prompt: String,
    pub resume_session_id: Option<String>,
    pub max_turns: Option<u32>,
    pub system_prompt: Option<String>,
}

pub struct AssistantSupervisor {
    program: String,
    args: Vec<String>,
    stream: Mutex<Option<StreamHandle>>,
    streaming: AtomicBool,
    prompt_versions: Mutex<HashMap<String, String>>,
}

impl AssistantSupervisor {
    #[must_use]
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            stream: Mutex::new(None),
            streaming: AtomicBool::new(false),
            prompt_versions: Mutex::new(HashMap::new()),
        }
    }

    /// Cheap, non-blocking check used by the caller to decide between
    /// "append to live stream" and "re-route and resume" (spec.md §4.7.2).
    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.streaming.load(Ordering::SeqCst)
    }

    /// Spawn the Assistant process and send the initial `start` message.
    /// `on_message` receives every decoded line from the process's stdout
    /// until the stream ends or is stopped.
    pub async fn start(&self, params: StartParams, on_message: UnboundedSender<OutboundMessage>) -> AssistantResult<()> {
        let mut guard = self.stream.lock().await;
        if guard.is_some() {
            return Err(AssistantError::AlreadyStreaming);
        }

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(AssistantError::Spawn)?;

        let stdin = child.stdin.take().ok_or(AssistantError::StreamClosed)?;
        let stdout = child.stdout.take().ok_or(AssistantError::StreamClosed)?;

        let reader = tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if line.trim().is_empty() {
                            continue;
                        }
                        match serde_json::from_str::<OutboundMessage>(&line) {
                            Ok(message) => {
                                if on_message.send(message).is_err() {
                                    break;
                                }
                            }
                            Err(err) => {
                                tracing::warn!(error = %err, line, "failed to decode assistant message");
                            }
                        }
                    }
                    Ok(None) => break,
                    Err(err) => {
                        tracing::warn!(error = %err, "error reading assistant stdout");
                        break;
                    }
                }
            }
        });

        let mut handle = StreamHandle { child, stdin, reader };
        let start_message = InboundMessage::Start {
            prompt: params.prompt,
            resume_session_id: params.resume_session_id,
            max_turns: params.max_turns,
            system_prompt: params.system_prompt,
        };
        write_message(&mut handle.stdin, &start_message).await?;

        *guard = Some(handle);
        self.streaming.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Append a message to a live stream. Errors with `NotStreaming` if no
    /// Assistant is currently running for this session.
    pub async fn add_stream_message(&self, content: impl Into<String>) -> AssistantResult<()> {
        let mut guard = self.stream.lock().await;
        let handle = guard.as_mut().ok_or(AssistantError::NotStreaming)?;
        write_message(&mut handle.stdin, &InboundMessage::StreamMessage { content: content.into() }).await
    }

    /// Stop the Assistant. Cooperative and idempotent — calling `stop` when
    /// nothing is streaming is a no-op, matching spec.md §5's "must be
    /// swallowed" cancellation semantics.
    pub async fn stop(&self) {
        let mut guard = self.stream.lock().await;
        if let Some(mut handle) = guard.take() {
            let _ = write_message(&mut handle.stdin, &InboundMessage::Stop).await;
            handle.reader.abort();
            let _ = handle.child.start_kill();
        }
        self.streaming.store(false, Ordering::SeqCst);
    }

    /// Record the prompt-template version in use for each label, so the
    /// next subroutine prompt can cite it (spec.md: `<version-tag value=".."/>`
    /// extraction on label-based prompt selection).
    pub async fn update_prompt_versions(&self, versions: HashMap<String, String>) {
        *self.prompt_versions.lock().await = versions;
    }

    #[must_use]
    pub async fn prompt_version(&self, label: &str) -> Option<String> {
        self.prompt_versions.lock().await.get(label).cloned()
    }
}

async fn write_message(stdin: &mut ChildStdin, message: &InboundMessage) -> AssistantResult<()> {
    let mut line = serde_json::to_string(message)?;
    line.push('\n');
    stdin.write_all(line.as_bytes()).await.map_err(AssistantError::Write)?;
    stdin.flush().await.map_err(AssistantError::Write)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn echo_supervisor() -> AssistantSupervisor {
        // `cat` round-trips stdin to stdout; not valid JSON per line, so
        // these tests only exercise spawn/stop/serialization, not decoding.
        AssistantSupervisor::new("cat", vec![])
    }

    #[tokio::test]
    async fn is_streaming_reflects_start_and_stop() {
        let supervisor = echo_supervisor();
        assert!(!supervisor.is_streaming());
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        supervisor
            .start(
                StartParams {
                    prompt: "hello".into(),
                    resume_session_id: None,
                    max_turns: None,
                    system_prompt: None,
                },
                tx,
            )
            .await
            .unwrap();
        assert!(supervisor.is_streaming());
        supervisor.stop().await;
        assert!(!supervisor.is_streaming());
    }

    #[tokio::test]
    async fn double_start_is_rejected() {
        let supervisor = echo_supervisor();
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        supervisor
            .start(
                StartParams {
                    prompt: "hello".into(),
                    resume_session_id: None,
                    max_turns: None,
                    system_prompt: None,
                },
                tx.clone(),
            )
            .await
            .unwrap();
        let result = supervisor
            .start(
                StartParams {
                    prompt: "again".into(),
                    resume_session_id: None,
                    max_turns: None,
                    system_prompt: None,
                },
                tx,
            )
            .await;
        assert!(matches!(result, Err(AssistantError::AlreadyStreaming)));
        supervisor.stop().await;
    }

    #[tokio::test]
    async fn stop_without_start_is_a_harmless_noop() {
        let supervisor = echo_supervisor();
        supervisor.stop().await;
        assert!(!supervisor.is_streaming());
    }

    #[tokio::test]
    async fn add_stream_message_without_start_errors() {
        let supervisor = echo_supervisor();
        let result = supervisor.add_stream_message("hi").await;
        assert!(matches!(result, Err(AssistantError::NotStreaming)));
    }

    #[tokio::test]
    async fn prompt_versions_round_trip() {
        let supervisor = echo_supervisor();
        let mut versions = HashMap::new();
        versions.insert("debugger".to_string(), "v3".to_string());
        supervisor.update_prompt_versions(versions).await;
        assert_eq!(supervisor.prompt_version("debugger").await, Some("v3".to_string()));
        assert_eq!(supervisor.prompt_version("builder").await, None);
    }
}
