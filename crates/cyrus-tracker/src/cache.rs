//! 5-minute GET response cache, keyed by `(endpoint, args)` and shared across
//! repositories that use the same Tracker token.

use dashmap::DashMap;
use std::time::{Duration, Instant};

struct CachedValue {
    body: String,
    stored_at: Instant,
}

/// A TTL-bound response cache for idempotent GETs.
pub struct ResponseCache {
    ttl: Duration,
    entries: DashMap<String, CachedValue>,
}

impl ResponseCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: DashMap::new(),
        }
    }

    #[must_use]
    pub fn key(endpoint: &str, args: &str) -> String {
        format!("{endpoint}?{args}")
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        let entry = self.entries.get(key)?;
        if entry.stored_at.elapsed() < self.ttl {
            Some(entry.body.clone())
        } else {
            None
        }
    }

    pub fn put(&self, key: String, body: String) {
        self.entries.insert(
            key,
            CachedValue {
                body,
                stored_at: Instant::now(),
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_entry_is_returned() {
        let cache = ResponseCache::new(Duration::from_secs(300));
        let key = ResponseCache::key("getIssue", "ENG-1");
        cache.put(key.clone(), "{}".into());
        assert_eq!(cache.get(&key), Some("{}".into()));
    }

    #[test]
    fn expired_entry_is_not_returned() {
        let cache = ResponseCache::new(Duration::from_millis(0));
        let key = ResponseCache::key("getIssue", "ENG-1");
        cache.put(key.clone(), "{}".into());
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.get(&key), None);
    }

    #[test]
    fn distinct_args_are_distinct_keys() {
        let cache = ResponseCache::new(Duration::from_secs(300));
        cache.put(ResponseCache::key("getIssue", "ENG-1"), "a".into());
        cache.put(ResponseCache::key("getIssue", "ENG-2"), "b".into());
        assert_eq!(cache.get(&ResponseCache::key("getIssue", "ENG-1")), Some("a".into()));
        assert_eq!(cache.get(&ResponseCache::key("getIssue", "ENG-2")), Some("b".into()));
    }
}
