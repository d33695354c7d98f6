//! In-memory key/value memo with a fixed time-to-live.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use parking_lot::Mutex;
use std::{collections::HashMap, time::Duration};
use tracing::trace;

pub const DEFAULT_TTL: Duration = Duration::from_secs(10 * 60);

#[derive(Debug)]
struct CacheEntry<V> {
    data: V,
    stored_at: DateTime<Utc>,
}

/// Time-boxed cache shared by concurrent callers; last writer wins.
///
/// Expired entries are evicted lazily on lookup. There is no size bound.
#[derive(Debug)]
pub struct TtlCache<V> {
    ttl: ChronoDuration,
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl: ChronoDuration::from_std(ttl).unwrap_or(ChronoDuration::MAX),
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        self.get_at(key, Utc::now())
    }

    /// Looks up `key` as of `now`; an entry is fresh while `now - stored_at < ttl`.
    pub fn get_at(&self, key: &str, now: DateTime<Utc>) -> Option<V> {
        let mut entries = self.entries.lock();
        let fresh = entries
            .get(key)
            .map(|entry| now.signed_duration_since(entry.stored_at) < self.ttl)?;

        if fresh {
            trace!(key, "cache hit");
            entries.get(key).map(|entry| entry.data.clone())
        } else {
            trace!(key, "cache entry expired");
            entries.remove(key);
            None
        }
    }

    pub fn set(&self, key: &str, data: V) {
        self.set_at(key, data, Utc::now());
    }

    pub fn set_at(&self, key: &str, data: V, stored_at: DateTime<Utc>) {
        let entry = CacheEntry { data, stored_at };
        self.entries.lock().insert(key.to_string(), entry);
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn set_then_get_returns_value() {
        let cache = TtlCache::default();
        cache.set("k", 42);
        assert_eq!(cache.get("k"), Some(42));
    }

    #[test]
    fn unknown_key_is_none() {
        let cache: TtlCache<u8> = TtlCache::default();
        assert_eq!(cache.get("missing"), None);
    }

    #[test]
    fn entry_expires_after_ttl() {
        let cache = TtlCache::default();
        let stored = Utc::now();
        cache.set_at("k", "v", stored);

        assert_eq!(cache.get_at("k", stored + ChronoDuration::minutes(9)), Some("v"));
        assert_eq!(cache.get_at("k", stored + ChronoDuration::minutes(10)), None);
    }

    #[test]
    fn expired_entry_is_evicted_on_lookup() {
        let cache = TtlCache::default();
        let stored = Utc::now();
        cache.set_at("k", 1, stored);

        assert_eq!(cache.get_at("k", stored + ChronoDuration::minutes(11)), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn set_overwrites_and_restarts_ttl() {
        let cache = TtlCache::default();
        let t0 = Utc::now();
        cache.set_at("k", 1, t0);
        cache.set_at("k", 2, t0 + ChronoDuration::minutes(8));

        assert_eq!(cache.get_at("k", t0 + ChronoDuration::minutes(12)), Some(2));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn clear_drops_everything() {
        let cache = TtlCache::default();
        cache.set("a", 1);
        cache.set("b", 2);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn concurrent_writers_share_one_map() {
        let cache = Arc::new(TtlCache::new(Duration::from_secs(60)));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || cache.set(&format!("k{i}"), i))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(cache.len(), 8);
        assert_eq!(cache.get("k3"), Some(3));
    }
}
