//! Wire frame for both transport modes: a decoded `Event` plus the token it
//! arrived on, so C3 can narrow candidates to that token's repositories.

use cyrus_core::Event;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Frame {
    /// A decoded webhook event ready for routing.
    Event { tracker_token: String, event: Event },
    /// Proxy keep-alive; never delivered as an event (spec.md §4.9).
    Heartbeat,
}
