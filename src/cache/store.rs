//! Cache storage.
//!
//! A `CacheStore` is a bounded LRU map guarded by its own mutex. The response
//! cache uses three of them: static assets, pages, and non-cacheable markers.

use std::num::NonZeroUsize;
use std::sync::Mutex;

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use bytes::Bytes;
use lru::LruCache;
use metrics::counter;

use super::config::CacheConfig;
use super::lock::mutex_lock;
use super::stats::METRIC_CACHE_EVICT_TOTAL;

pub const STATIC_STORE: &str = "static-assets";
pub const PAGE_STORE: &str = "pages";
pub const NON_CACHEABLE_STORE: &str = "non-cacheable";

/// A captured, replayable `200 OK` response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub body: Bytes,
    pub media_type: Option<HeaderValue>,
    pub headers: Vec<(HeaderName, HeaderValue)>,
}

impl CacheEntry {
    pub fn new(headers: &HeaderMap, body: Bytes) -> Self {
        let media_type = headers.get(axum::http::header::CONTENT_TYPE).cloned();
        let headers = headers
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        Self {
            body,
            media_type,
            headers,
        }
    }
}

/// Bounded least-recently-used map from request path to `V`.
///
/// `get` and `put` refresh recency; `contains` and `delete` do not.
pub struct CacheStore<V> {
    name: &'static str,
    entries: Mutex<LruCache<String, V>>,
}

impl<V: Clone> CacheStore<V> {
    pub fn new(name: &'static str, capacity: NonZeroUsize) -> Self {
        Self {
            name,
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn get(&self, key: &str) -> Option<V> {
        mutex_lock(&self.entries, self.name, "get").get(key).cloned()
    }

    /// Insert or replace `key`, returning the key evicted to make room, if any.
    pub fn put(&self, key: String, value: V) -> Option<String> {
        // `push` hands back the old pair on replacement too; only a
        // different key means something was evicted.
        let displaced = mutex_lock(&self.entries, self.name, "put").push(key.clone(), value);

        match displaced {
            Some((evicted, _)) if evicted != key => {
                counter!(METRIC_CACHE_EVICT_TOTAL, "store" => self.name).increment(1);
                Some(evicted)
            }
            _ => None,
        }
    }

    /// Remove `key`. Absent keys are ignored.
    pub fn delete(&self, key: &str) -> bool {
        mutex_lock(&self.entries, self.name, "delete")
            .pop(key)
            .is_some()
    }

    pub fn contains(&self, key: &str) -> bool {
        mutex_lock(&self.entries, self.name, "contains").contains(key)
    }

    pub fn len(&self) -> usize {
        mutex_lock(&self.entries, self.name, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        mutex_lock(&self.entries, self.name, "capacity").cap().get()
    }
}

/// The three process-wide stores, created once at startup and shared by the
/// middleware and the invalidation hooks.
pub struct CacheStores {
    pub static_assets: CacheStore<CacheEntry>,
    pub pages: CacheStore<CacheEntry>,
    pub non_cacheable: CacheStore<()>,
}

impl CacheStores {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            static_assets: CacheStore::new(STATIC_STORE, config.static_capacity_non_zero()),
            pages: CacheStore::new(PAGE_STORE, config.page_capacity_non_zero()),
            non_cacheable: CacheStore::new(
                NON_CACHEABLE_STORE,
                config.non_cacheable_capacity_non_zero(),
            ),
        }
    }

    /// Remember `key` as permanently non-cacheable.
    pub fn mark_non_cacheable(&self, key: &str) {
        self.non_cacheable.put(key.to_string(), ());
    }

    pub fn is_non_cacheable(&self, key: &str) -> bool {
        self.non_cacheable.contains(key)
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use axum::http::header::CONTENT_TYPE;

    use super::*;

    fn store(capacity: usize) -> CacheStore<CacheEntry> {
        CacheStore::new(PAGE_STORE, NonZeroUsize::new(capacity).expect("non-zero"))
    }

    fn entry(body: &'static str) -> CacheEntry {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/html"));
        CacheEntry::new(&headers, Bytes::from_static(body.as_bytes()))
    }

    #[test]
    fn entry_captures_media_type_and_headers() {
        let cached = entry("hello");
        assert_eq!(
            cached.media_type,
            Some(HeaderValue::from_static("text/html"))
        );
        assert_eq!(cached.headers.len(), 1);
        assert_eq!(cached.body, Bytes::from_static(b"hello"));
    }

    #[test]
    fn put_get_delete_roundtrip() {
        let store = store(4);
        assert!(store.get("/a").is_none());

        assert_eq!(store.put("/a".to_string(), entry("a")), None);
        assert!(store.contains("/a"));
        assert_eq!(store.get("/a"), Some(entry("a")));

        assert!(store.delete("/a"));
        assert!(!store.contains("/a"));
        assert!(store.is_empty());
    }

    #[test]
    fn put_existing_key_replaces_without_eviction() {
        let store = store(2);
        store.put("/a".to_string(), entry("old"));
        store.put("/b".to_string(), entry("b"));

        assert_eq!(store.put("/a".to_string(), entry("new")), None);
        assert_eq!(store.len(), 2);
        assert_eq!(store.get("/a").map(|e| e.body), Some(Bytes::from_static(b"new")));
    }

    #[test]
    fn eviction_follows_access_not_insertion() {
        let store = store(2);
        store.put("/a".to_string(), entry("a"));
        store.put("/b".to_string(), entry("b"));

        // Touch /a so /b becomes least recently used.
        assert!(store.get("/a").is_some());

        assert_eq!(store.put("/c".to_string(), entry("c")), Some("/b".to_string()));
        assert!(store.contains("/a"));
        assert!(!store.contains("/b"));
        assert!(store.contains("/c"));
    }

    #[test]
    fn n_plus_one_inserts_evict_only_the_oldest() {
        let store = store(3);
        for key in ["/1", "/2", "/3", "/4"] {
            store.put(key.to_string(), entry("x"));
        }

        assert!(!store.contains("/1"));
        for key in ["/2", "/3", "/4"] {
            assert!(store.contains(key), "{key} should survive");
        }
        assert_eq!(store.capacity(), 3);
    }

    #[test]
    fn delete_absent_key_is_noop() {
        let store = store(2);
        store.put("/a".to_string(), entry("a"));

        assert!(!store.delete("/missing"));
        assert!(store.delete("/a"));
        assert!(!store.delete("/a"));
        assert!(store.is_empty());
    }

    #[test]
    fn contains_does_not_refresh_recency() {
        let store = store(2);
        store.put("/a".to_string(), entry("a"));
        store.put("/b".to_string(), entry("b"));

        assert!(store.contains("/a"));
        store.put("/c".to_string(), entry("c"));

        assert!(!store.contains("/a"));
        assert!(store.contains("/b"));
    }

    #[test]
    fn stores_are_independent() {
        let stores = CacheStores::new(&CacheConfig::default());
        stores.pages.put("/about".to_string(), entry("about"));
        stores.mark_non_cacheable("/static/big.bin");

        assert!(!stores.static_assets.contains("/about"));
        assert!(stores.is_non_cacheable("/static/big.bin"));
        assert!(!stores.is_non_cacheable("/about"));
        assert_eq!(stores.non_cacheable.capacity(), 10_000);
    }

    #[test]
    fn concurrent_put_get_delete_stay_within_capacity() {
        const CAPACITY: usize = 8;
        let store = store(CAPACITY);

        std::thread::scope(|scope| {
            for worker in 0..8_usize {
                let store = &store;
                scope.spawn(move || {
                    for i in 0..2_000_usize {
                        let key = format!("/{}", (worker * 7 + i) % 24);
                        match i % 4 {
                            0 | 1 => {
                                store.put(key, entry("page"));
                            }
                            2 => {
                                if let Some(found) = store.get(&key) {
                                    assert_eq!(found, entry("page"));
                                }
                            }
                            _ => {
                                store.delete(&key);
                            }
                        }
                        assert!(store.len() <= CAPACITY);
                    }
                });
            }
        });

        assert!(store.len() <= CAPACITY);
        store.put("/after".to_string(), entry("after"));
        assert_eq!(store.get("/after"), Some(entry("after")));
    }

    #[test]
    fn concurrent_writes_to_one_key_leave_one_winner() {
        let store = store(2);

        std::thread::scope(|scope| {
            for body in ["first", "second", "third", "fourth"] {
                let store = &store;
                scope.spawn(move || {
                    assert_eq!(store.put("/same".to_string(), entry(body)), None);
                });
            }
        });

        assert_eq!(store.len(), 1);
        let winner = store.get("/same").expect("one write survives").body;
        let winner = std::str::from_utf8(&winner).expect("utf-8 body");
        assert!(
            ["first", "second", "third", "fourth"].contains(&winner),
            "unexpected body {winner:?}"
        );
    }

    #[test]
    fn store_recovers_from_poisoned_lock() {
        let store = store(2);

        let _ = catch_unwind(AssertUnwindSafe(|| {
            let _guard = store
                .entries
                .lock()
                .expect("entries lock should be acquired");
            panic!("poison entries lock");
        }));

        store.put("/a".to_string(), entry("a"));
        assert!(store.get("/a").is_some());
    }
}
