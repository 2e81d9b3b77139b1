//! `DirectTransport`: an `axum` HTTP server exposing the webhook POST
//! endpoint, the idiomatic Rust webhook-ingress shape used across the
//! example repositories.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use cyrus_core::Event;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use crate::error::{TransportError, TransportResult};

#[derive(Clone)]
struct AppState {
    tx: mpsc::Sender<(String, Event)>,
}

#[derive(serde::Deserialize)]
struct InboundWebhook {
    tracker_token: String,
    event: Event,
}

pub struct DirectTransport {
    rx: mpsc::Receiver<(String, Event)>,
}

impl DirectTransport {
    /// Bind an HTTP server at `addr` and begin accepting webhook POSTs.
    ///
    /// # Errors
    /// Returns an error if the listener cannot bind.
    pub async fn bind(addr: std::net::SocketAddr) -> TransportResult<Self> {
        let (tx, rx) = mpsc::channel(64);
        let state = AppState { tx };
        let app = Router::new().route("/webhooks", post(handle_webhook)).with_state(state);
        let listener = TcpListener::bind(addr).await.map_err(TransportError::Http)?;
        tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, app).await {
                tracing::error!(error = %err, "direct transport server exited");
            }
        });
        Ok(Self { rx })
    }

    pub async fn recv(&mut self) -> Option<(String, Event)> {
        self.rx.recv().await
    }
}

async fn handle_webhook(State(state): State<AppState>, Json(body): Json<InboundWebhook>) -> axum::http::StatusCode {
    if state.tx.send((body.tracker_token, body.event)).await.is_err() {
        return axum::http::StatusCode::SERVICE_UNAVAILABLE;
    }
    axum::http::StatusCode::ACCEPTED
}

#[cfg(test)]
mod tests {
    use super::*;
    use cyrus_core::{IssueId, SessionId};

    #[tokio::test]
    async fn decodes_and_forwards_posted_webhook() {
        let (tx, mut rx) = mpsc::channel(1);
        let state = AppState { tx };
        let body = InboundWebhook {
            tracker_token: "tok".into(),
            event: Event::SessionPrompted {
                webhook_id: "wh-1".into(),
                organization_id: "org".into(),
                session_id: SessionId::from("s1"),
                prompt: "hi".into(),
                signal: None,
                comment: None,
            },
        };
        let status = handle_webhook(State(state), Json(body)).await;
        assert_eq!(status, axum::http::StatusCode::ACCEPTED);
        let (token, event) = rx.recv().await.unwrap();
        assert_eq!(token, "tok");
        assert_eq!(event.webhook_id(), "wh-1");
    }

    #[tokio::test]
    async fn closed_receiver_yields_service_unavailable() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let state = AppState { tx };
        let body = InboundWebhook {
            tracker_token: "tok".into(),
            event: Event::IssueUnassigned {
                webhook_id: "wh-2".into(),
                organization_id: "org".into(),
                issue_id: IssueId::from("ENG-1"),
            },
        };
        let status = handle_webhook(State(state), Json(body)).await;
        assert_eq!(status, axum::http::StatusCode::SERVICE_UNAVAILABLE);
    }
}
