//! Bounded, time-expiring embedding cache
//!
//! Keys are a fixed-length hash of the trimmed, lower-cased text. Entries are
//! evicted least-recently-used first on overflow and treated as misses once
//! older than the TTL. All bookkeeping happens under one lock; the lock is
//! never held while an embedding is being computed, so concurrent misses for
//! the same text may both compute.

use lru::LruCache;
use parking_lot::Mutex;
use serde::Serialize;
use std::future::Future;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use crate::config::CacheConfig;
use crate::error::SearchResult;

const KEY_HEX_CHARS: usize = 16;

/// Cache key for `text`
pub fn cache_key(text: &str) -> String {
    let normalized = text.trim().to_lowercase();
    let hash = blake3::hash(normalized.as_bytes());
    hash.to_hex()[..KEY_HEX_CHARS].to_string()
}

#[derive(Debug, Clone)]
struct CacheEntry {
    vector: Vec<f32>,
    created_at: Instant,
    hit_count: u64,
}

#[derive(Debug)]
struct CacheState {
    entries: LruCache<String, CacheEntry>,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl CacheState {
    fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: LruCache::new(capacity),
            hits: 0,
            misses: 0,
            evictions: 0,
        }
    }
}

/// Snapshot of cache counters
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub max_size: usize,
    pub hits: u64,
    pub misses: u64,
    /// Entries dropped to make room
    pub evictions: u64,
    pub hit_rate: f64,
}

/// LRU + TTL cache from text to embedding vector
#[derive(Debug)]
pub struct EmbeddingCache {
    state: Mutex<CacheState>,
    capacity: NonZeroUsize,
    ttl: Duration,
}

impl Default for EmbeddingCache {
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}

impl EmbeddingCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self::with_limits(config.max_entries, Duration::from_secs(config.ttl_secs))
    }

    /// A zero capacity is treated as one entry
    pub fn with_limits(max_entries: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            state: Mutex::new(CacheState::new(capacity)),
            capacity,
            ttl,
        }
    }

    /// Cached vector for `text`, if present and not expired
    pub fn get(&self, text: &str) -> Option<Vec<f32>> {
        let key = cache_key(text);
        let mut state = self.state.lock();

        let expired = state
            .entries
            .peek(&key)
            .map(|entry| entry.created_at.elapsed() > self.ttl);
        match expired {
            Some(false) => {}
            Some(true) => {
                state.entries.pop(&key);
                state.misses += 1;
                return None;
            }
            None => {
                state.misses += 1;
                return None;
            }
        }

        state.hits += 1;
        let entry = state.entries.get_mut(&key)?;
        entry.hit_count += 1;
        Some(entry.vector.clone())
    }

    /// Store `vector` for `text`, evicting the least recently used entry when full
    pub fn set(&self, text: &str, vector: Vec<f32>) {
        let key = cache_key(text);
        let entry = CacheEntry {
            vector,
            created_at: Instant::now(),
            hit_count: 0,
        };

        let mut state = self.state.lock();
        if let Some((evicted, _)) = state.entries.push(key.clone(), entry) {
            if evicted != key {
                state.evictions += 1;
            }
        }
    }

    /// Return the cached vector or compute, store and return a new one.
    ///
    /// `compute` runs at most once per call. Errors are returned as-is and
    /// nothing is cached for them.
    pub async fn get_or_compute<F, Fut>(&self, text: &str, compute: F) -> SearchResult<Vec<f32>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = SearchResult<Vec<f32>>>,
    {
        if let Some(vector) = self.get(text) {
            return Ok(vector);
        }
        let vector = compute().await?;
        self.set(text, vector.clone());
        Ok(vector)
    }

    /// Hit count of the entry for `text`
    pub fn hit_count(&self, text: &str) -> Option<u64> {
        let state = self.state.lock();
        state.entries.peek(&cache_key(text)).map(|e| e.hit_count)
    }

    /// Drop all expired entries, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let mut state = self.state.lock();
        let expired: Vec<String> = state
            .entries
            .iter()
            .filter(|(_, entry)| entry.created_at.elapsed() > self.ttl)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            state.entries.pop(key);
        }
        expired.len()
    }

    /// Remove all entries and reset counters
    pub fn clear(&self) {
        *self.state.lock() = CacheState::new(self.capacity);
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock();
        let lookups = state.hits + state.misses;
        CacheStats {
            size: state.entries.len(),
            max_size: self.capacity.get(),
            hits: state.hits,
            misses: state.misses,
            evictions: state.evictions,
            hit_rate: if lookups == 0 {
                0.0
            } else {
                state.hits as f64 / lookups as f64
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SearchError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_key_normalization() {
        assert_eq!(cache_key("  Deep Learning "), cache_key("deep learning"));
        assert_ne!(cache_key("deep learning"), cache_key("machine learning"));
        assert_eq!(cache_key("anything").len(), 16);
    }

    #[test]
    fn test_get_set_and_stats() {
        let cache = EmbeddingCache::default();
        assert_eq!(cache.get("query"), None);

        cache.set("query", vec![0.1, 0.2]);
        assert_eq!(cache.get("QUERY "), Some(vec![0.1, 0.2]));
        assert_eq!(cache.hit_count("query"), Some(1));

        let stats = cache.stats();
        assert_eq!(stats.size, 1);
        assert_eq!(stats.max_size, 1000);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_rate - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_lru_eviction() {
        let cache = EmbeddingCache::with_limits(2, Duration::from_secs(60));
        cache.set("a", vec![1.0]);
        cache.set("b", vec![2.0]);
        // "a" becomes most recently used
        assert!(cache.get("a").is_some());
        cache.set("c", vec![3.0]);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.stats().evictions, 1);
        assert!(cache.get("b").is_none());
        assert!(cache.get("a").is_some());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn test_zero_capacity_holds_one_entry() {
        let cache = EmbeddingCache::with_limits(0, Duration::from_secs(60));
        cache.set("a", vec![1.0]);
        cache.set("b", vec![2.0]);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.stats().max_size, 1);
        assert_eq!(cache.get("b"), Some(vec![2.0]));
    }

    #[test]
    fn test_overwrite_does_not_evict() {
        let cache = EmbeddingCache::with_limits(2, Duration::from_secs(60));
        cache.set("a", vec![1.0]);
        cache.set("b", vec![2.0]);
        cache.set("a", vec![1.5]);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.stats().evictions, 0);
        assert_eq!(cache.get("a"), Some(vec![1.5]));
        assert!(cache.get("b").is_some());
    }

    #[test]
    fn test_ttl_expiry() {
        let cache = EmbeddingCache::with_limits(10, Duration::from_millis(30));
        cache.set("old", vec![1.0]);
        std::thread::sleep(Duration::from_millis(60));

        assert_eq!(cache.get("old"), None);
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_purge_and_clear() {
        let cache = EmbeddingCache::with_limits(10, Duration::from_millis(30));
        cache.set("x", vec![1.0]);
        cache.set("y", vec![2.0]);
        std::thread::sleep(Duration::from_millis(60));
        assert_eq!(cache.purge_expired(), 2);

        cache.set("z", vec![3.0]);
        let _ = cache.get("z");
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.stats().hits, 0);
    }

    #[tokio::test]
    async fn test_get_or_compute_calls_once_within_ttl() {
        let cache = EmbeddingCache::default();
        let counter = AtomicUsize::new(0);
        let calls = &counter;

        for _ in 0..2 {
            let vector = cache
                .get_or_compute("x", move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(vec![0.5, 0.5])
                })
                .await
                .unwrap();
            assert_eq!(vector, vec![0.5, 0.5]);
        }

        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_get_or_compute_errors_not_cached() {
        let cache = EmbeddingCache::default();
        let result = cache
            .get_or_compute("x", || async { Err(SearchError::Unavailable("down".into())) })
            .await;
        assert!(result.is_err());
        assert!(cache.is_empty());
    }
}
