use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to connect to proxy: {0}")]
    Connect(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("failed to decode frame: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("transport channel closed")]
    Closed,
    #[error("http server error: {0}")]
    Http(#[from] std::io::Error),
}

pub type TransportResult<T> = Result<T, TransportError>;
