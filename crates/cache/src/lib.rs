//! TTL-bounded cache fronting upstream collaborator calls.
//!
//! Upstream feeds are rate limited, so every fetch in the worker goes
//! through [`TtlCache::get_or_fetch`]. A hit inside the TTL returns the
//! stored value without touching the network; a miss or expired entry
//! triggers exactly one re-fetch. Expired entries are never served as a
//! fallback when the fetch fails: market data silently going stale past
//! its TTL is worse than a visible failure.
//!
//! Writes are last-fetch-wins and entries are replaced, never mutated in
//! place, so concurrent refreshes of the same key are harmless.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use tracing::{debug, trace};

/// A single cached value with its freshness window.
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    fetched_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

/// Cache hit/miss counters for observability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

/// TTL cache keyed by string, bounded in size.
///
/// Values are cloned out on read; keep them cheap to clone (the worker
/// stores small structs and `Vec`s of quotes).
pub struct TtlCache<V> {
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
    stats: Mutex<CacheStats>,
    max_entries: usize,
}

impl<V: Clone> TtlCache<V> {
    /// Creates a cache bounded to `max_entries` live entries.
    #[must_use]
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            stats: Mutex::new(CacheStats::default()),
            max_entries: max_entries.max(1),
        }
    }

    /// Returns the value for `key`, fetching through `fetcher` on a miss
    /// or expired entry.
    ///
    /// The lock is not held across the fetch, so concurrent callers may
    /// both fetch on a cold key; the later write simply replaces the
    /// earlier one.
    ///
    /// # Errors
    /// Propagates the fetcher's error. The cache is left unchanged: a
    /// failed refresh does not resurrect the expired entry.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        fetcher: F,
    ) -> anyhow::Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<V>>,
    {
        let now = Utc::now();

        {
            let entries = self.entries.lock();
            if let Some(entry) = entries.get(key) {
                if entry.expires_at > now {
                    trace!(key, "Cache hit");
                    self.stats.lock().hits += 1;
                    return Ok(entry.value.clone());
                }
            }
        }

        self.stats.lock().misses += 1;
        debug!(key, "Cache miss; fetching upstream");
        let value = fetcher().await?;

        let mut entries = self.entries.lock();
        entries.insert(
            key.to_string(),
            CacheEntry {
                value: value.clone(),
                fetched_at: now,
                expires_at: now + ttl,
            },
        );

        if entries.len() > self.max_entries {
            let evicted = evict_oldest_expiry(&mut entries, self.max_entries);
            self.stats.lock().evictions += evicted;
        }

        Ok(value)
    }

    /// Returns the value for `key` if present and unexpired.
    #[must_use]
    pub fn peek(&self, key: &str) -> Option<V> {
        let entries = self.entries.lock();
        entries
            .get(key)
            .filter(|e| e.expires_at > Utc::now())
            .map(|e| e.value.clone())
    }

    /// Returns when `key` was last fetched, expired or not.
    #[must_use]
    pub fn fetched_at(&self, key: &str) -> Option<DateTime<Utc>> {
        self.entries.lock().get(key).map(|e| e.fetched_at)
    }

    /// Number of stored entries, including expired ones not yet replaced.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Hit/miss/eviction counters since construction.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        *self.stats.lock()
    }

    /// Drops all entries. The cache is disposable and rebuildable from
    /// source, so this is always safe.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

/// Evicts entries with the oldest `expires_at` until `target` remain.
fn evict_oldest_expiry<V>(entries: &mut HashMap<String, CacheEntry<V>>, target: usize) -> u64 {
    let mut evicted = 0;
    while entries.len() > target {
        let oldest = entries
            .iter()
            .min_by_key(|(_, e)| e.expires_at)
            .map(|(k, _)| k.clone());
        match oldest {
            Some(key) => {
                entries.remove(&key);
                evicted += 1;
            }
            None => break,
        }
    }
    evicted
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    // ==================== Hit/Miss Semantics ====================

    #[tokio::test]
    async fn test_hit_within_ttl_skips_fetcher() {
        let cache: TtlCache<u32> = TtlCache::new(16);
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let calls = calls.clone();
            let value = cache
                .get_or_fetch("quotes:m1", Duration::minutes(5), move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(7)
                })
                .await
                .unwrap();
            assert_eq!(value, 7);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats().hits, 2);
        assert_eq!(cache.stats().misses, 1);
    }

    #[tokio::test]
    async fn test_expired_entry_refetches_exactly_once() {
        let cache: TtlCache<u32> = TtlCache::new(16);
        let calls = Arc::new(AtomicUsize::new(0));

        // Zero TTL: the entry is expired by the time of the next read.
        for _ in 0..2 {
            let calls = calls.clone();
            cache
                .get_or_fetch("quotes:m1", Duration::zero(), move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(1)
                })
                .await
                .unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_distinct_keys_fetch_independently() {
        let cache: TtlCache<String> = TtlCache::new(16);

        let a = cache
            .get_or_fetch("hist:alpha", Duration::hours(24), || async {
                Ok("alpha".to_string())
            })
            .await
            .unwrap();
        let b = cache
            .get_or_fetch("hist:bravo", Duration::hours(24), || async {
                Ok("bravo".to_string())
            })
            .await
            .unwrap();

        assert_eq!(a, "alpha");
        assert_eq!(b, "bravo");
        assert_eq!(cache.len(), 2);
    }

    // ==================== Failure Semantics ====================

    #[tokio::test]
    async fn test_fetch_failure_propagates_without_stale_fallback() {
        let cache: TtlCache<u32> = TtlCache::new(16);

        // Seed with an immediately-expired value.
        cache
            .get_or_fetch("quotes:m1", Duration::zero(), || async { Ok(9) })
            .await
            .unwrap();

        let result = cache
            .get_or_fetch("quotes:m1", Duration::minutes(5), || async {
                anyhow::bail!("upstream down")
            })
            .await;

        assert!(result.is_err());
        // The expired value must not come back on a subsequent peek.
        assert!(cache.peek("quotes:m1").is_none());
    }

    #[tokio::test]
    async fn test_failed_fetch_leaves_cache_usable() {
        let cache: TtlCache<u32> = TtlCache::new(16);

        let _ = cache
            .get_or_fetch("k", Duration::minutes(5), || async {
                anyhow::bail!("boom")
            })
            .await;

        let value = cache
            .get_or_fetch("k", Duration::minutes(5), || async { Ok(3) })
            .await
            .unwrap();
        assert_eq!(value, 3);
    }

    // ==================== Eviction ====================

    #[tokio::test]
    async fn test_eviction_drops_oldest_expiry_first() {
        let cache: TtlCache<u32> = TtlCache::new(2);

        cache
            .get_or_fetch("short", Duration::minutes(1), || async { Ok(1) })
            .await
            .unwrap();
        cache
            .get_or_fetch("medium", Duration::minutes(30), || async { Ok(2) })
            .await
            .unwrap();
        cache
            .get_or_fetch("long", Duration::hours(12), || async { Ok(3) })
            .await
            .unwrap();

        assert_eq!(cache.len(), 2);
        assert!(cache.peek("short").is_none());
        assert!(cache.peek("medium").is_some());
        assert!(cache.peek("long").is_some());
        assert_eq!(cache.stats().evictions, 1);
    }

    // ==================== Replacement ====================

    #[tokio::test]
    async fn test_refetch_replaces_value_and_timestamp() {
        let cache: TtlCache<u32> = TtlCache::new(16);

        cache
            .get_or_fetch("k", Duration::zero(), || async { Ok(1) })
            .await
            .unwrap();
        let first_fetch = cache.fetched_at("k").unwrap();

        cache
            .get_or_fetch("k", Duration::minutes(5), || async { Ok(2) })
            .await
            .unwrap();

        assert_eq!(cache.peek("k"), Some(2));
        assert!(cache.fetched_at("k").unwrap() >= first_fetch);
    }

    #[tokio::test]
    async fn test_clear() {
        let cache: TtlCache<u32> = TtlCache::new(16);
        cache
            .get_or_fetch("k", Duration::minutes(5), || async { Ok(1) })
            .await
            .unwrap();

        cache.clear();
        assert!(cache.is_empty());
    }
}
