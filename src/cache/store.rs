//! Response cache storage.
//!
//! Bounded LRU of rendered responses. Expiry is the caller's concern: the
//! store keeps `created_at` on every entry but never interprets a ttl.

use std::num::NonZeroUsize;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use bytes::Bytes;
use lru::LruCache;
use metrics::counter;
use tracing::debug;

use super::config::CacheConfig;
use super::keys::CacheKey;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

pub(crate) const METRIC_CACHE_EVICT_TOTAL: &str = "vellum_cache_evict_total";

/// A fully-rendered, minified response body plus its validator.
///
/// Entries are immutable; a new render always produces a new item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedItem {
    pub body: Bytes,
    /// Hex digest of `body`, without quotes or weak prefix.
    pub etag: String,
    pub content_type: String,
    pub created_at: Instant,
}

impl CachedItem {
    pub fn new(body: Bytes, etag: String, content_type: impl Into<String>) -> Self {
        Self {
            body,
            etag,
            content_type: content_type.into(),
            created_at: Instant::now(),
        }
    }

    /// Returns true while `now - created_at < ttl`.
    pub fn is_fresh_at(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.created_at) < ttl
    }
}

/// Response cache.
///
/// Every operation takes the single write lock, so recency bookkeeping and
/// capacity eviction are serialized. Once disabled, the store stays disabled.
pub struct ResponseCache {
    entries: RwLock<Option<LruCache<CacheKey, Arc<CachedItem>>>>,
}

impl ResponseCache {
    /// Create a store holding at most `capacity` responses; zero disables it.
    pub fn new(capacity: usize) -> Self {
        Self::with_capacity(NonZeroUsize::new(capacity))
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::with_capacity(config.capacity_non_zero())
    }

    pub fn disabled() -> Self {
        Self::with_capacity(None)
    }

    fn with_capacity(capacity: Option<NonZeroUsize>) -> Self {
        Self {
            entries: RwLock::new(capacity.map(LruCache::new)),
        }
    }

    pub fn is_enabled(&self) -> bool {
        rw_read(&self.entries, SOURCE, "is_enabled").is_some()
    }

    /// Look up an entry and mark it most recently used.
    pub fn get(&self, key: &CacheKey) -> Option<Arc<CachedItem>> {
        rw_write(&self.entries, SOURCE, "get")
            .as_mut()
            .and_then(|entries| entries.get(key).cloned())
    }

    /// Look up an entry without touching its recency.
    pub fn peek(&self, key: &CacheKey) -> Option<Arc<CachedItem>> {
        rw_read(&self.entries, SOURCE, "peek")
            .as_ref()
            .and_then(|entries| entries.peek(key).cloned())
    }

    /// Insert or replace an entry, evicting the least recently used one when
    /// the store is full. Returns the evicted key, if any.
    pub fn add(&self, key: CacheKey, item: impl Into<Arc<CachedItem>>) -> Option<CacheKey> {
        let mut guard = rw_write(&self.entries, SOURCE, "add");
        let entries = guard.as_mut()?;

        match entries.push(key.clone(), item.into()) {
            Some((evicted, _)) if evicted != key => {
                counter!(METRIC_CACHE_EVICT_TOTAL).increment(1);
                debug!(cache = "response", evicted = %evicted, "evicted least recently used entry");
                Some(evicted)
            }
            _ => None,
        }
    }

    pub fn remove(&self, key: &CacheKey) {
        if let Some(entries) = rw_write(&self.entries, SOURCE, "remove").as_mut() {
            entries.pop(key);
        }
    }

    /// Remove `key` only while it still maps to `expected`.
    ///
    /// Used when evicting an expired entry so a fresher item stored by a
    /// concurrent render is left in place.
    pub fn remove_entry(&self, key: &CacheKey, expected: &Arc<CachedItem>) -> bool {
        let mut guard = rw_write(&self.entries, SOURCE, "remove_entry");
        let Some(entries) = guard.as_mut() else {
            return false;
        };

        let same = entries
            .peek(key)
            .is_some_and(|current| Arc::ptr_eq(current, expected));
        if same {
            entries.pop(key);
        }
        same
    }

    pub fn purge(&self) {
        if let Some(entries) = rw_write(&self.entries, SOURCE, "purge").as_mut() {
            entries.clear();
        }
    }

    /// Drop every entry and turn the store into a permanent no-op.
    pub fn disable(&self) {
        rw_write(&self.entries, SOURCE, "disable").take();
    }

    /// Get the number of cached responses.
    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len")
            .as_ref()
            .map_or(0, LruCache::len)
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        rw_read(&self.entries, SOURCE, "capacity")
            .as_ref()
            .map_or(0, |entries| entries.cap().get())
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use super::*;

    fn key(path: &str) -> CacheKey {
        CacheKey::new(path, "", "index.html", "v1")
    }

    fn item(body: &'static str) -> CachedItem {
        CachedItem::new(
            Bytes::from_static(body.as_bytes()),
            super::super::etag::content_etag(body.as_bytes()),
            "text/html; charset=utf-8",
        )
    }

    #[test]
    fn add_then_get_roundtrip() {
        let store = ResponseCache::new(4);
        assert!(store.get(&key("/")).is_none());

        assert!(store.add(key("/"), item("<p>home</p>")).is_none());

        let cached = store.get(&key("/")).expect("cached entry");
        assert_eq!(cached.body, Bytes::from_static(b"<p>home</p>"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn evicts_least_recently_used() {
        let store = ResponseCache::new(2);
        store.add(key("/a"), item("a"));
        store.add(key("/b"), item("b"));

        // Touch /a so /b becomes the eviction candidate.
        assert!(store.get(&key("/a")).is_some());

        let evicted = store.add(key("/c"), item("c"));
        assert_eq!(evicted, Some(key("/b")));
        assert!(store.get(&key("/a")).is_some());
        assert!(store.get(&key("/b")).is_none());
        assert!(store.get(&key("/c")).is_some());
    }

    #[test]
    fn replacing_existing_key_is_not_an_eviction() {
        let store = ResponseCache::new(1);
        store.add(key("/"), item("old"));
        assert!(store.add(key("/"), item("new")).is_none());
        assert_eq!(
            store.get(&key("/")).expect("replaced").body,
            Bytes::from_static(b"new")
        );
    }

    #[test]
    fn remove_is_noop_when_absent() {
        let store = ResponseCache::new(2);
        store.remove(&key("/missing"));
        store.add(key("/"), item("x"));
        store.remove(&key("/"));
        assert!(store.is_empty());
    }

    #[test]
    fn remove_entry_keeps_replacement() {
        let store = ResponseCache::new(2);
        store.add(key("/"), item("stale"));
        let stale = store.get(&key("/")).expect("stale entry");

        store.add(key("/"), item("fresh"));
        assert!(!store.remove_entry(&key("/"), &stale));
        assert_eq!(
            store.peek(&key("/")).expect("fresh entry").body,
            Bytes::from_static(b"fresh")
        );

        let fresh = store.peek(&key("/")).expect("fresh entry");
        assert!(store.remove_entry(&key("/"), &fresh));
        assert!(store.is_empty());
    }

    #[test]
    fn purge_clears_everything() {
        let store = ResponseCache::new(4);
        store.add(key("/a"), item("a"));
        store.add(key("/b"), item("b"));
        store.purge();
        assert!(store.is_empty());
        assert!(store.is_enabled());
    }

    #[test]
    fn disable_is_one_way() {
        let store = ResponseCache::new(4);
        store.add(key("/"), item("x"));
        store.disable();

        assert!(!store.is_enabled());
        assert!(store.get(&key("/")).is_none());
        assert!(store.add(key("/"), item("y")).is_none());
        assert!(store.get(&key("/")).is_none());
        assert_eq!(store.capacity(), 0);
    }

    #[test]
    fn zero_capacity_is_disabled() {
        let store = ResponseCache::from_config(&CacheConfig::disabled());
        assert!(!store.is_enabled());
        store.add(key("/"), item("x"));
        assert!(store.get(&key("/")).is_none());
    }

    #[test]
    fn freshness_is_strictly_less_than_ttl() {
        let entry = item("x");
        let ttl = Duration::from_secs(60);
        assert!(entry.is_fresh_at(entry.created_at, ttl));
        assert!(entry.is_fresh_at(entry.created_at + Duration::from_secs(59), ttl));
        assert!(!entry.is_fresh_at(entry.created_at + ttl, ttl));
        assert!(!entry.is_fresh_at(entry.created_at, Duration::ZERO));
    }

    #[test]
    fn store_recovers_from_poisoned_lock() {
        let store = ResponseCache::new(2);

        let _ = catch_unwind(AssertUnwindSafe(|| {
            let _guard = store
                .entries
                .write()
                .expect("entries lock should be acquired");
            panic!("poison entries lock");
        }));

        store.add(key("/"), item("x"));
        assert!(store.get(&key("/")).is_some());
    }
}
