//! Webhook Transport (C9): one connection per Tracker token, multiplexed to
//! every repository sharing that token, delivering decoded `Event`s to the
//! Webhook Router. Two modes behind one trait (spec.md §4.9).

pub mod direct;
pub mod error;
pub mod frame;
pub mod proxy;

use async_trait::async_trait;
use cyrus_core::Event;

pub use direct::DirectTransport;
pub use error::{TransportError, TransportResult};
pub use frame::Frame;
pub use proxy::ProxyTransport;

/// Common interface over the two transport modes. Reconnection is each
/// transport's own concern; callers only ever see decoded events.
#[async_trait]
pub trait Transport: Send {
    /// Await the next decoded event, paired with the Tracker token it
    /// arrived on. Returns `None` once the transport is permanently closed.
    async fn recv(&mut self) -> Option<(String, Event)>;
}

#[async_trait]
impl Transport for ProxyTransport {
    async fn recv(&mut self) -> Option<(String, Event)> {
        ProxyTransport::recv(self).await
    }
}

#[async_trait]
impl Transport for DirectTransport {
    async fn recv(&mut self) -> Option<(String, Event)> {
        DirectTransport::recv(self).await
    }
}
