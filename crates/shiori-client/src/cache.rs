//! In-memory response cache keyed by request fingerprint.
//!
//! Decoded responses are cached under a deterministic fingerprint of the
//! exact request parameters, so two logically-identical requests always
//! collide on the same key regardless of call order. Every entry carries a
//! fixed TTL; reads past expiry are misses and evict the entry.
//!
//! Keys are namespace-prefixed (`title:`, `list:`, `tag:`) so mutations can
//! drop a whole namespace at once: personal-list writes invalidate every
//! `list:` entry, because a label change can affect multiple cached page
//! windows.
//!
//! The clock is injectable so tests control expiry deterministically
//! instead of relying on wall-clock timing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use tracing::debug;

use shiori_core::defaults;

/// Namespace for cached catalog reads.
pub const NS_TITLE: &str = "title";

/// Namespace for cached personal-list reads.
pub const NS_LIST: &str = "list";

/// Namespace for cached tag metadata reads.
pub const NS_TAG: &str = "tag";

/// Time source for cache expiry.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

struct CacheEntry {
    expires_at: DateTime<Utc>,
    payload: JsonValue,
}

/// Cache statistics for monitoring.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

/// Response cache shared by all gateway reads.
#[derive(Clone)]
pub struct ResponseCache {
    inner: Arc<CacheInner>,
}

struct CacheInner {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseCache {
    /// Cache with the standard TTL and the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Cache with an injected clock.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                entries: RwLock::new(HashMap::new()),
                ttl: Duration::seconds(defaults::CACHE_TTL_SECS),
                clock,
                hits: AtomicU64::new(0),
                misses: AtomicU64::new(0),
                evictions: AtomicU64::new(0),
            }),
        }
    }

    /// Deterministic cache key for a request: namespace prefix plus a
    /// truncated digest of the serialized parameters.
    pub fn fingerprint(namespace: &str, params: &JsonValue) -> String {
        let mut hasher = Sha256::new();
        hasher.update(params.to_string().as_bytes());
        let hash = hex::encode(hasher.finalize());
        format!("{}:{}", namespace, &hash[..16])
    }

    /// Get a cached payload; expired entries are evicted and miss.
    pub async fn get(&self, key: &str) -> Option<JsonValue> {
        let now = self.inner.clock.now();

        {
            let entries = self.inner.entries.read().await;
            match entries.get(key) {
                Some(entry) if now <= entry.expires_at => {
                    self.inner.hits.fetch_add(1, Ordering::Relaxed);
                    debug!(key, cache_hit = true, "cache read");
                    return Some(entry.payload.clone());
                }
                Some(_) => {}
                None => {
                    self.inner.misses.fetch_add(1, Ordering::Relaxed);
                    debug!(key, cache_hit = false, "cache read");
                    return None;
                }
            }
        }

        // Entry exists but is past expiry: evict under the write lock.
        let mut entries = self.inner.entries.write().await;
        if let Some(entry) = entries.get(key) {
            if now > entry.expires_at {
                entries.remove(key);
                self.inner.evictions.fetch_add(1, Ordering::Relaxed);
            } else {
                // Refreshed by a concurrent put between the locks.
                self.inner.hits.fetch_add(1, Ordering::Relaxed);
                return Some(entry.payload.clone());
            }
        }
        self.inner.misses.fetch_add(1, Ordering::Relaxed);
        debug!(key, cache_hit = false, "cache read (expired)");
        None
    }

    /// Store a payload under a fingerprint key.
    pub async fn put(&self, key: impl Into<String>, payload: JsonValue) {
        let key = key.into();
        let expires_at = self.inner.clock.now() + self.inner.ttl;
        debug!(key, "cache write");
        self.inner
            .entries
            .write()
            .await
            .insert(key, CacheEntry { expires_at, payload });
    }

    /// Drop every entry in a namespace. Returns the number removed.
    pub async fn invalidate_namespace(&self, namespace: &str) -> usize {
        let prefix = format!("{}:", namespace);
        let mut entries = self.inner.entries.write().await;
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(&prefix));
        let removed = before - entries.len();
        if removed > 0 {
            self.inner
                .evictions
                .fetch_add(removed as u64, Ordering::Relaxed);
        }
        debug!(namespace, evicted = removed, "cache namespace invalidated");
        removed
    }

    /// Drop every entry whose key matches a predicate.
    pub async fn invalidate_where(&self, predicate: impl Fn(&str) -> bool) -> usize {
        let mut entries = self.inner.entries.write().await;
        let before = entries.len();
        entries.retain(|key, _| !predicate(key));
        let removed = before - entries.len();
        if removed > 0 {
            self.inner
                .evictions
                .fetch_add(removed as u64, Ordering::Relaxed);
        }
        removed
    }

    /// Drop everything.
    pub async fn clear(&self) {
        self.inner.entries.write().await.clear();
    }

    /// Counters since construction.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.inner.hits.load(Ordering::Relaxed),
            misses: self.inner.misses.load(Ordering::Relaxed),
            evictions: self.inner.evictions.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    /// Clock the test advances by hand.
    struct ManualClock {
        now: Mutex<DateTime<Utc>>,
    }

    impl ManualClock {
        fn starting_at(now: DateTime<Utc>) -> Arc<Self> {
            Arc::new(Self { now: Mutex::new(now) })
        }

        fn advance(&self, seconds: i64) {
            let mut now = self.now.lock().unwrap();
            *now += Duration::seconds(seconds);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock().unwrap()
        }
    }

    fn epoch() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn test_fingerprint_deterministic() {
        let body = json!({ "filters": ["search", "=", "x"], "page": 1 });
        assert_eq!(
            ResponseCache::fingerprint(NS_TITLE, &body),
            ResponseCache::fingerprint(NS_TITLE, &body)
        );
    }

    #[test]
    fn test_fingerprint_namespace_prefix() {
        let body = json!({ "page": 1 });
        assert!(ResponseCache::fingerprint(NS_LIST, &body).starts_with("list:"));
    }

    #[test]
    fn test_fingerprint_differs_per_namespace() {
        let body = json!({ "page": 1 });
        assert_ne!(
            ResponseCache::fingerprint(NS_TITLE, &body),
            ResponseCache::fingerprint(NS_LIST, &body)
        );
    }

    #[test]
    fn test_fingerprint_differs_per_params() {
        let a = json!({ "page": 1 });
        let b = json!({ "page": 2 });
        assert_ne!(
            ResponseCache::fingerprint(NS_TITLE, &a),
            ResponseCache::fingerprint(NS_TITLE, &b)
        );
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let cache = ResponseCache::with_clock(ManualClock::starting_at(epoch()));
        cache.put("title:abc", json!({ "results": [] })).await;
        assert_eq!(cache.get("title:abc").await, Some(json!({ "results": [] })));
        assert_eq!(cache.stats().hits, 1);
    }

    #[tokio::test]
    async fn test_get_unknown_key_misses() {
        let cache = ResponseCache::with_clock(ManualClock::starting_at(epoch()));
        assert_eq!(cache.get("title:nope").await, None);
        assert_eq!(cache.stats().misses, 1);
    }

    #[tokio::test]
    async fn test_expired_entry_misses_and_evicts() {
        let clock = ManualClock::starting_at(epoch());
        let cache = ResponseCache::with_clock(clock.clone());

        cache.put("title:abc", json!(1)).await;
        clock.advance(defaults::CACHE_TTL_SECS + 1);

        assert_eq!(cache.get("title:abc").await, None);
        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.evictions, 1);

        // The entry is gone, not just hidden.
        assert_eq!(cache.get("title:abc").await, None);
        assert_eq!(cache.stats().misses, 2);
    }

    #[tokio::test]
    async fn test_entry_alive_just_before_ttl() {
        let clock = ManualClock::starting_at(epoch());
        let cache = ResponseCache::with_clock(clock.clone());

        cache.put("title:abc", json!(1)).await;
        clock.advance(defaults::CACHE_TTL_SECS - 1);

        assert_eq!(cache.get("title:abc").await, Some(json!(1)));
    }

    #[tokio::test]
    async fn test_invalidate_namespace_spares_others() {
        let cache = ResponseCache::with_clock(ManualClock::starting_at(epoch()));
        cache.put("list:a", json!(1)).await;
        cache.put("list:b", json!(2)).await;
        cache.put("title:c", json!(3)).await;

        let removed = cache.invalidate_namespace(NS_LIST).await;
        assert_eq!(removed, 2);
        assert_eq!(cache.get("list:a").await, None);
        assert_eq!(cache.get("list:b").await, None);
        assert_eq!(cache.get("title:c").await, Some(json!(3)));
    }

    #[tokio::test]
    async fn test_invalidate_where_predicate() {
        let cache = ResponseCache::with_clock(ManualClock::starting_at(epoch()));
        cache.put("title:aa", json!(1)).await;
        cache.put("title:bb", json!(2)).await;

        let removed = cache.invalidate_where(|key| key.ends_with("aa")).await;
        assert_eq!(removed, 1);
        assert_eq!(cache.get("title:aa").await, None);
        assert_eq!(cache.get("title:bb").await, Some(json!(2)));
    }

    #[tokio::test]
    async fn test_clear() {
        let cache = ResponseCache::with_clock(ManualClock::starting_at(epoch()));
        cache.put("title:a", json!(1)).await;
        cache.clear().await;
        assert_eq!(cache.get("title:a").await, None);
    }
}
