//! `ProxyTransport`: one `tokio-tungstenite` WebSocket connection per
//! Tracker token, reconnecting with the same full-jitter backoff shape as
//! the teacher's `astrid-gateway::discord_proxy::backoff` (via
//! `cyrus_tracker::Backoff`, the crate both now share).

use std::time::Duration;

use cyrus_core::Event;
use cyrus_tracker::Backoff;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

use crate::error::TransportError;
use crate::frame::Frame;

const BACKOFF_BASE_MS: u64 = 500;
const BACKOFF_MAX_MS: u64 = 30_000;

pub struct ProxyTransport {
    rx: mpsc::Receiver<(String, Event)>,
    _task: JoinHandle<()>,
}

impl ProxyTransport {
    /// Connect to `url`, authenticating with `tracker_token`, and begin
    /// forwarding decoded events. Reconnects indefinitely on disconnect.
    #[must_use]
    pub fn connect(url: String, tracker_token: String) -> Self {
        let (tx, rx) = mpsc::channel(64);
        let task = tokio::spawn(run_connection_loop(url, tracker_token, tx));
        Self { rx, _task: task }
    }

    pub async fn recv(&mut self) -> Option<(String, Event)> {
        self.rx.recv().await
    }
}

async fn run_connection_loop(url: String, tracker_token: String, tx: mpsc::Sender<(String, Event)>) {
    let mut backoff = Backoff::new(BACKOFF_BASE_MS, BACKOFF_MAX_MS);
    loop {
        match run_once(&url, &tracker_token, &tx).await {
            Ok(()) => {
                // Graceful close from the proxy side; reconnect promptly.
                backoff.reset();
            }
            Err(err) => {
                tracing::warn!(error = %err, url, "proxy connection failed");
            }
        }
        if tx.is_closed() {
            return;
        }
        let delay = backoff.next_delay();
        tracing::debug!(delay_ms = delay.as_millis() as u64, "reconnecting to proxy");
        tokio::time::sleep(delay.max(Duration::from_millis(1))).await;
    }
}

async fn run_once(url: &str, tracker_token: &str, tx: &mpsc::Sender<(String, Event)>) -> Result<(), TransportError> {
    let (ws_stream, _response) = tokio_tungstenite::connect_async(url).await?;
    let (mut write, mut read) = ws_stream.split();
    write
        .send(Message::Text(
            serde_json::json!({ "type": "auth", "token": tracker_token }).to_string().into(),
        ))
        .await?;

    while let Some(message) = read.next().await {
        let message = message?;
        let Message::Text(text) = message else { continue };
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            match serde_json::from_str::<Frame>(line) {
                Ok(Frame::Event { tracker_token, event }) => {
                    if tx.send((tracker_token, event)).await.is_err() {
                        return Ok(());
                    }
                }
                Ok(Frame::Heartbeat) => {}
                Err(err) => tracing::warn!(error = %err, line, "failed to decode proxy frame"),
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heartbeat_frame_round_trips_without_an_event() {
        let frame: Frame = serde_json::from_str(r#"{"kind":"heartbeat"}"#).unwrap();
        assert!(matches!(frame, Frame::Heartbeat));
    }
}
