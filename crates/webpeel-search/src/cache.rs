//! Search result cache: the one long-lived mutable state in the core
//! (spec.md §5). Entry-level locking via `dashmap::DashMap` so readers never
//! block writers; entries are size-bounded and TTL-expired.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use webpeel_types::SearchResult;

#[derive(Clone)]
struct CacheEntry {
    results: Vec<SearchResult>,
    inserted_at: Instant,
}

/// Fixed-capacity, TTL-expiring cache keyed by `(query, count)`. A separate
/// insertion-order queue (behind its own small mutex) drives LRU eviction
/// without taking the per-entry lock the `DashMap` already gives readers.
pub struct SearchCache {
    entries: DashMap<String, CacheEntry>,
    order: Mutex<VecDeque<String>>,
    capacity: usize,
    ttl: Duration,
}

impl SearchCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: DashMap::with_capacity(capacity),
            order: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            ttl,
        }
    }

    fn key(query: &str, count: u32) -> String {
        format!("{}:{count}", query.trim().to_lowercase())
    }

    pub fn get(&self, query: &str, count: u32) -> Option<Vec<SearchResult>> {
        let key = Self::key(query, count);
        let entry = self.entries.get(&key)?;
        if entry.inserted_at.elapsed() > self.ttl {
            drop(entry);
            self.entries.remove(&key);
            return None;
        }
        Some(entry.results.clone())
    }

    pub fn put(&self, query: &str, count: u32, results: Vec<SearchResult>) {
        let key = Self::key(query, count);
        let is_new = !self.entries.contains_key(&key);
        self.entries.insert(
            key.clone(),
            CacheEntry {
                results,
                inserted_at: Instant::now(),
            },
        );
        if is_new {
            let mut order = self.order.lock().unwrap_or_else(|e| e.into_inner());
            order.push_back(key);
            while order.len() > self.capacity {
                if let Some(oldest) = order.pop_front() {
                    self.entries.remove(&oldest);
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for SearchCache {
    fn default() -> Self {
        Self::new(512, Duration::from_secs(600))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn result(n: u32) -> SearchResult {
        SearchResult::new(
            format!("title {n}"),
            Url::parse(&format!("https://example.com/{n}")).unwrap(),
            "snippet".to_string(),
        )
    }

    #[test]
    fn caches_and_expires() {
        let cache = SearchCache::new(4, Duration::from_millis(10));
        cache.put("rust async", 5, vec![result(1)]);
        assert!(cache.get("rust async", 5).is_some());
        std::thread::sleep(Duration::from_millis(30));
        assert!(cache.get("rust async", 5).is_none());
    }

    #[test]
    fn evicts_oldest_beyond_capacity() {
        let cache = SearchCache::new(2, Duration::from_secs(60));
        cache.put("a", 1, vec![result(1)]);
        cache.put("b", 1, vec![result(2)]);
        cache.put("c", 1, vec![result(3)]);
        assert_eq!(cache.len(), 2);
        assert!(cache.get("a", 1).is_none());
        assert!(cache.get("c", 1).is_some());
    }
}
