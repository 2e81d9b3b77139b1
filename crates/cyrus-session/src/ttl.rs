//! A TTL-bound set, shared by the webhook deduplicator and the bot-provenance
//! index. Entries are swept lazily on lookup and by a periodic background
//! sweep, so it self-cleans even without a sweeper running (tests don't need
//! one).

use dashmap::DashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

pub struct TtlSet<T: Eq + Hash + Clone> {
    ttl: Duration,
    entries: DashMap<T, Instant>,
}

impl<T: Eq + Hash + Clone> TtlSet<T> {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: DashMap::new(),
        }
    }

    /// Insert `value`, refreshing its expiry if already present.
    pub fn insert(&self, value: T) {
        self.entries.insert(value, Instant::now());
    }

    /// Whether `value` is present and not yet expired.
    #[must_use]
    pub fn contains(&self, value: &T) -> bool {
        match self.entries.get(value) {
            Some(entry) => entry.elapsed() < self.ttl,
            None => false,
        }
    }

    /// Drop every entry older than the TTL. Returns the number evicted.
    pub fn sweep(&self) -> usize {
        let ttl = self.ttl;
        let before = self.entries.len();
        self.entries.retain(|_, inserted_at| inserted_at.elapsed() < ttl);
        before - self.entries.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_entry_is_contained() {
        let set = TtlSet::new(Duration::from_secs(60));
        set.insert("a");
        assert!(set.contains(&"a"));
        assert!(!set.contains(&"b"));
    }

    #[test]
    fn expired_entry_is_not_contained() {
        let set = TtlSet::new(Duration::from_millis(0));
        set.insert("a");
        std::thread::sleep(Duration::from_millis(2));
        assert!(!set.contains(&"a"));
    }

    #[test]
    fn sweep_evicts_expired_only() {
        let set: TtlSet<&str> = TtlSet::new(Duration::from_millis(5));
        set.insert("old");
        std::thread::sleep(Duration::from_millis(10));
        set.insert("new");
        let evicted = set.sweep();
        assert_eq!(evicted, 1);
        assert!(!set.contains(&"old"));
        assert!(set.contains(&"new"));
    }
}
