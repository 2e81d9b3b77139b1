//! Webhook Deduplicator (C2): fingerprint-based suppression of repeat
//! deliveries within a TTL window (spec.md §4.2).

use cyrus_core::Event;
use sha2::{Digest, Sha256};
use std::time::Duration;

use crate::ttl::TtlSet;

const DEFAULT_TTL: Duration = Duration::from_secs(10 * 60);

/// Computes a stable fingerprint for an event and tracks which fingerprints
/// have been seen within the TTL window.
pub struct WebhookDeduplicator {
    seen: TtlSet<String>,
}

impl Default for WebhookDeduplicator {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl WebhookDeduplicator {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            seen: TtlSet::new(ttl),
        }
    }

    #[must_use]
    pub fn fingerprint(event: &Event) -> String {
        let (event_type, action, subject_id, revision) = event.fingerprint_key();
        let mut hasher = Sha256::new();
        hasher.update(event_type.as_bytes());
        hasher.update(b"|");
        hasher.update(action.as_bytes());
        hasher.update(b"|");
        hasher.update(subject_id.as_bytes());
        hasher.update(b"|");
        hasher.update(revision.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Returns `true` if this fingerprint was already seen within the TTL
    /// window (the event should be dropped). As a side effect, records the
    /// fingerprint as seen — callers must not call this twice for the same
    /// delivery.
    pub fn check_and_record(&self, fingerprint: &str) -> bool {
        let is_duplicate = self.seen.contains(&fingerprint.to_string());
        self.seen.insert(fingerprint.to_string());
        is_duplicate
    }

    /// Drop expired fingerprints. Intended to run on a periodic background
    /// tick (spec.md: "A background sweep evicts expired entries").
    pub fn sweep(&self) -> usize {
        self.seen.sweep()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cyrus_core::{IssueId, SessionId};

    fn sample_event(webhook_id: &str) -> Event {
        Event::SessionPrompted {
            webhook_id: webhook_id.into(),
            organization_id: "org-1".into(),
            session_id: SessionId::from("s1"),
            prompt: "hello".into(),
            signal: None,
            comment: None,
        }
    }

    #[test]
    fn identical_fingerprint_is_duplicate_on_second_delivery() {
        let dedup = WebhookDeduplicator::default();
        let fp = WebhookDeduplicator::fingerprint(&sample_event("wh-1"));
        assert!(!dedup.check_and_record(&fp), "first delivery must not be a duplicate");
        assert!(dedup.check_and_record(&fp), "second delivery must be a duplicate");
    }

    #[test]
    fn distinct_webhooks_produce_distinct_fingerprints() {
        let fp_a = WebhookDeduplicator::fingerprint(&sample_event("wh-1"));
        let fp_b = WebhookDeduplicator::fingerprint(&sample_event("wh-2"));
        assert_ne!(fp_a, fp_b);
    }

    #[test]
    fn expired_fingerprint_is_no_longer_a_duplicate() {
        let dedup = WebhookDeduplicator::new(Duration::from_millis(0));
        let fp = WebhookDeduplicator::fingerprint(&sample_event("wh-1"));
        assert!(!dedup.check_and_record(&fp));
        std::thread::sleep(Duration::from_millis(2));
        assert!(!dedup.check_and_record(&fp), "expired entry must be treated as fresh");
    }
}
