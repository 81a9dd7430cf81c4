//! Bounded result cache for item comparisons.
//!
//! Entries are keyed by item id plus the serialized config and served while
//! younger than their TTL. When full, the oldest insertion is evicted first,
//! regardless of how often it was read.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::domain::entities::comparison::ItemComparisonResults;

struct Entry {
    results: ItemComparisonResults,
    item_id: String,
    stored_at: Instant,
    ttl: Duration,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<String, Entry>,
    /// Keys in insertion order.
    order: VecDeque<String>,
}

impl Inner {
    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
        self.order.retain(|k| k != key);
    }
}

pub struct ResultCache {
    inner: Mutex<Inner>,
    capacity: usize,
}

impl ResultCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// A fresh entry for `key`. Expired entries are evicted on the way.
    pub fn get(&self, key: &str) -> Option<ItemComparisonResults> {
        let mut inner = self.lock();
        let expired = match inner.entries.get(key) {
            None => return None,
            Some(entry) => entry.stored_at.elapsed() >= entry.ttl,
        };
        if expired {
            inner.remove(key);
            return None;
        }
        inner.entries.get(key).map(|e| e.results.clone())
    }

    /// Store `results`, evicting the oldest insertions beyond `max_entries`
    /// (itself capped by the cache capacity).
    pub fn insert(&self, key: String, results: ItemComparisonResults, ttl: Duration, max_entries: usize) {
        let limit = max_entries.clamp(1, self.capacity);
        let mut inner = self.lock();
        if inner.entries.contains_key(&key) {
            inner.remove(&key);
        }
        while inner.entries.len() >= limit {
            match inner.order.pop_front() {
                Some(oldest) => {
                    inner.entries.remove(&oldest);
                }
                None => break,
            }
        }
        inner.order.push_back(key.clone());
        inner.entries.insert(
            key,
            Entry {
                item_id: results.item_id.clone(),
                results,
                stored_at: Instant::now(),
                ttl,
            },
        );
    }

    /// Drop every entry for `item_id`. Returns how many were removed.
    pub fn invalidate_item(&self, item_id: &str) -> usize {
        let mut inner = self.lock();
        let stale: Vec<String> = inner
            .entries
            .iter()
            .filter(|(_, e)| e.item_id == item_id)
            .map(|(k, _)| k.clone())
            .collect();
        for key in &stale {
            inner.remove(key);
        }
        stale.len()
    }

    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.order.clear();
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned cache only ever holds complete entries.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::comparison_config::ComparisonConfig;

    fn results(item_id: &str) -> ItemComparisonResults {
        ItemComparisonResults::degraded(item_id, &ComparisonConfig::default(), "test".into())
    }

    const LONG: Duration = Duration::from_secs(300);

    #[test]
    fn test_hit_and_expiry() {
        let cache = ResultCache::new(10);
        cache.insert("a|{}".into(), results("a"), LONG, 10);
        assert!(cache.get("a|{}").is_some());

        cache.insert("b|{}".into(), results("b"), Duration::ZERO, 10);
        assert!(cache.get("b|{}").is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_fifo_eviction_ignores_reads() {
        let cache = ResultCache::new(2);
        cache.insert("a".into(), results("a"), LONG, 2);
        cache.insert("b".into(), results("b"), LONG, 2);
        // Reading "a" does not protect it.
        assert!(cache.get("a").is_some());
        cache.insert("c".into(), results("c"), LONG, 2);
        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_some());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn test_invalidate_item() {
        let cache = ResultCache::new(10);
        cache.insert("a|1".into(), results("a"), LONG, 10);
        cache.insert("a|2".into(), results("a"), LONG, 10);
        cache.insert("b|1".into(), results("b"), LONG, 10);
        assert_eq!(cache.invalidate_item("a"), 2);
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }
}
