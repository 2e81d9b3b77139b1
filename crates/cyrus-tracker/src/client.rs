//! The Tracker client: rate-limited, retrying, response-cached calls against
//! the external issue-tracker API.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cyrus_core::{CommentId, IssueId, ReactionId, TeamId};
use reqwest::StatusCode;
use tracing::{debug, warn};

use crate::cache::ResponseCache;
use crate::error::{TrackerError, TrackerResult};
use crate::rate_limit::RateLimiter;
use crate::retry::retrying;
use crate::types::{Ack, ActivityType, Comment, Issue, IssuePatch, Label, Team, WorkflowState};

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_BASE_MS: u64 = 500;
const DEFAULT_RETRY_MAX_MS: u64 = 8_000;
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);
const DEFAULT_RATE_PER_SEC: u32 = 10;

/// Invoked whenever the client creates a comment on the Tracker's behalf, so
/// the caller can register the id as bot-authored (C4 provenance tracking).
/// Kept as a trait at this boundary (rather than a direct dependency on
/// `cyrus-session`) so `cyrus-tracker` has no upward dependency on session
/// state.
#[async_trait]
pub trait BotCommentSink: Send + Sync {
    async fn mark_bot_authored(&self, comment_id: &CommentId, author_user_id: &str);
}

/// No-op sink used when the caller does not need provenance tracking (e.g.
/// unit tests exercising only the client).
pub struct NullBotCommentSink;

#[async_trait]
impl BotCommentSink for NullBotCommentSink {
    async fn mark_bot_authored(&self, _comment_id: &CommentId, _author_user_id: &str) {}
}

/// The Tracker client. One instance is shared by every repository using the
/// same `tracker_token` (the rate limiter and response cache are the shared
/// resources per spec.md §5).
pub struct TrackerClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    rate_limiter: RateLimiter,
    cache: ResponseCache,
    bot_comment_sink: Arc<dyn BotCommentSink>,
    bot_user_id: String,
}

impl TrackerClient {
    #[must_use]
    pub fn new(base_url: impl Into<String>, token: impl Into<String>, bot_user_id: impl Into<String>) -> Self {
        Self::with_sink(base_url, token, bot_user_id, Arc::new(NullBotCommentSink))
    }

    #[must_use]
    pub fn with_sink(
        base_url: impl Into<String>,
        token: impl Into<String>,
        bot_user_id: impl Into<String>,
        bot_comment_sink: Arc<dyn BotCommentSink>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            token: token.into(),
            rate_limiter: RateLimiter::new(DEFAULT_RATE_PER_SEC),
            cache: ResponseCache::new(DEFAULT_CACHE_TTL),
            bot_comment_sink,
            bot_user_id: bot_user_id.into(),
        }
    }

    async fn get_cached<T: serde::de::DeserializeOwned>(&self, endpoint: &str, args: &str) -> TrackerResult<T> {
        let key = ResponseCache::key(endpoint, args);
        if let Some(cached) = self.cache.get(&key) {
            debug!(endpoint, "tracker response cache hit");
            return serde_json::from_str(&cached).map_err(|e| TrackerError::Decode(e.to_string()));
        }

        let body = self.request_retrying(reqwest::Method::GET, endpoint, None::<&()>).await?;
        self.cache.put(key, body.clone());
        serde_json::from_str(&body).map_err(|e| TrackerError::Decode(e.to_string()))
    }

    async fn request_retrying<B: serde::Serialize>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<&B>,
    ) -> TrackerResult<String> {
        let url = format!("{}{}", self.base_url, path);
        let body_json = body.map(|b| serde_json::to_vec(b)).transpose().map_err(|e| TrackerError::Decode(e.to_string()))?;

        retrying(DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_BASE_MS, DEFAULT_RETRY_MAX_MS, || {
            let url = url.clone();
            let method = method.clone();
            let body_json = body_json.clone();
            async move {
                self.rate_limiter.acquire().await;

                let mut req = self.http.request(method, &url).bearer_auth(&self.token);
                if let Some(bytes) = body_json {
                    req = req.header("content-type", "application/json").body(bytes);
                }

                let resp = match req.send().await {
                    Ok(r) => r,
                    Err(e) => return Err((TrackerError::Transient(e.to_string()), true)),
                };

                let status = resp.status();
                if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                    let text = resp.text().await.unwrap_or_default();
                    return Err((TrackerError::Auth(text), false));
                }
                if crate::retry::is_retryable_status(status.as_u16()) {
                    return Err((TrackerError::Transient(format!("status {status}")), true));
                }
                if !status.is_success() {
                    let text = resp.text().await.unwrap_or_default();
                    return Err((TrackerError::Transient(format!("status {status}: {text}")), false));
                }

                resp.text().await.map_err(|e| (TrackerError::Transient(e.to_string()), true))
            }
        })
        .await
    }

    pub async fn get_issue(&self, id: &IssueId) -> TrackerResult<Issue> {
        self.get_cached(&format!("/issues/{id}"), "").await
    }

    pub async fn list_comments(&self, issue_id: &IssueId) -> TrackerResult<Vec<Comment>> {
        self.get_cached(&format!("/issues/{issue_id}/comments"), "").await
    }

    pub async fn get_comment(&self, id: &CommentId) -> TrackerResult<Comment> {
        self.get_cached(&format!("/comments/{id}"), "").await
    }

    pub async fn create_comment(
        &self,
        issue_id: &IssueId,
        body: &str,
        parent_id: Option<&CommentId>,
    ) -> TrackerResult<Comment> {
        #[derive(serde::Serialize)]
        struct Req<'a> {
            body: &'a str,
            parent_id: Option<&'a str>,
        }
        let raw = self
            .request_retrying(
                reqwest::Method::POST,
                &format!("/issues/{issue_id}/comments"),
                Some(&Req {
                    body,
                    parent_id: parent_id.map(CommentId::as_str),
                }),
            )
            .await?;
        let comment: Comment = serde_json::from_str(&raw).map_err(|e| TrackerError::Decode(e.to_string()))?;
        self.bot_comment_sink.mark_bot_authored(&comment.id, &self.bot_user_id).await;
        Ok(comment)
    }

    pub async fn create_agent_activity(
        &self,
        session_id: &cyrus_core::SessionId,
        activity_type: ActivityType,
        body: &str,
    ) -> TrackerResult<Ack> {
        #[derive(serde::Serialize)]
        struct Req<'a> {
            #[serde(rename = "type")]
            kind: ActivityType,
            body: &'a str,
        }
        let raw = self
            .request_retrying(
                reqwest::Method::POST,
                &format!("/agent-sessions/{session_id}/activity"),
                Some(&Req { kind: activity_type, body }),
            )
            .await?;
        serde_json::from_str(&raw).map_err(|e| TrackerError::Decode(e.to_string()))
    }

    pub async fn add_reaction(&self, comment_id: &CommentId, emoji: &str) -> TrackerResult<ReactionId> {
        #[derive(serde::Serialize)]
        struct Req<'a> {
            emoji: &'a str,
        }
        #[derive(serde::Deserialize)]
        struct Resp {
            reaction_id: String,
        }
        let raw = self
            .request_retrying(
                reqwest::Method::POST,
                &format!("/comments/{comment_id}/reactions"),
                Some(&Req { emoji }),
            )
            .await?;
        let resp: Resp = serde_json::from_str(&raw).map_err(|e| TrackerError::Decode(e.to_string()))?;
        Ok(ReactionId::from(resp.reaction_id))
    }

    pub async fn delete_reaction(&self, reaction_id: &ReactionId) -> TrackerResult<Ack> {
        let raw = self
            .request_retrying::<()>(reqwest::Method::DELETE, &format!("/reactions/{reaction_id}"), None)
            .await?;
        if raw.trim().is_empty() {
            return Ok(Ack { ok: true });
        }
        serde_json::from_str(&raw).map_err(|e| TrackerError::Decode(e.to_string()))
    }

    pub async fn list_teams(&self) -> TrackerResult<Vec<Team>> {
        self.get_cached("/teams", "").await
    }

    pub async fn list_labels(&self) -> TrackerResult<Vec<Label>> {
        self.get_cached("/labels", "").await
    }

    pub async fn list_workflow_states(&self, team_id: &TeamId) -> TrackerResult<Vec<WorkflowState>> {
        self.get_cached(&format!("/teams/{team_id}/workflow-states"), "").await
    }

    pub async fn update_issue(&self, id: &IssueId, patch: &IssuePatch) -> TrackerResult<Ack> {
        let raw = self
            .request_retrying(reqwest::Method::PATCH, &format!("/issues/{id}"), Some(patch))
            .await?;
        if raw.trim().is_empty() {
            return Ok(Ack { ok: true });
        }
        warn!(issue_id = %id, "tracker returned a non-empty updateIssue body");
        Ok(Ack { ok: true })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn get_issue_parses_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/issues/ENG-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "ENG-1",
                "identifier": "ENG-1",
                "title": "Fix bug",
                "description": "",
                "branch_name": "eng-1",
                "team_key": "ENG",
                "project": null,
                "labels": ["debugger"],
                "assignee_id": null,
                "workflow_state_type": "started",
                "workflow_state_name": "In Progress",
                "parent_issue_id": null,
            })))
            .mount(&server)
            .await;

        let client = TrackerClient::new(server.uri(), "tok", "bot-1");
        let issue = client.get_issue(&IssueId::from("ENG-1")).await.unwrap();
        assert_eq!(issue.identifier, "ENG-1");
        assert_eq!(issue.labels, vec!["debugger".to_string()]);
    }

    #[tokio::test]
    async fn unauthorized_is_non_retryable_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/issues/ENG-1"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = TrackerClient::new(server.uri(), "bad-token", "bot-1");
        let err = client.get_issue(&IssueId::from("ENG-1")).await.unwrap_err();
        assert!(matches!(err, TrackerError::Auth(_)));
    }

    #[tokio::test]
    async fn create_comment_marks_bot_authored() {
        struct RecordingSink(tokio::sync::Mutex<Vec<String>>);
        #[async_trait]
        impl BotCommentSink for RecordingSink {
            async fn mark_bot_authored(&self, comment_id: &CommentId, _author: &str) {
                self.0.lock().await.push(comment_id.to_string());
            }
        }

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/issues/ENG-1/comments"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "c-99",
                "issue_id": "ENG-1",
                "body": "done",
                "author_user_id": "bot-1",
                "parent_id": null,
            })))
            .mount(&server)
            .await;

        let sink = Arc::new(RecordingSink(tokio::sync::Mutex::new(Vec::new())));
        let client = TrackerClient::with_sink(server.uri(), "tok", "bot-1", sink.clone());
        let comment = client.create_comment(&IssueId::from("ENG-1"), "done", None).await.unwrap();
        assert_eq!(comment.id, CommentId::from("c-99"));
        assert_eq!(sink.0.lock().await.as_slice(), &["c-99".to_string()]);
    }

    #[tokio::test]
    async fn server_error_retries_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/labels"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/labels"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{"name": "debugger"}])))
            .mount(&server)
            .await;

        let client = TrackerClient::new(server.uri(), "tok", "bot-1");
        let labels = client.list_labels().await.unwrap();
        assert_eq!(labels.len(), 1);
        assert_eq!(labels[0].name, "debugger");
    }
}
