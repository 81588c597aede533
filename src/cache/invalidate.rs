//! Invalidation hooks for write paths.
//!
//! Mutations call these only after their change is committed; calling them
//! earlier lets a concurrent reader repopulate the page store with stale
//! content.

use std::sync::Arc;

use tracing::debug;

use super::{CacheConfig, CacheStores};

#[derive(Clone)]
pub struct CacheInvalidator {
    stores: Arc<CacheStores>,
    index_key: Arc<str>,
}

impl CacheInvalidator {
    pub fn new(config: &CacheConfig, stores: Arc<CacheStores>) -> Self {
        Self {
            stores,
            index_key: Arc::from(config.index_path.as_str()),
        }
    }

    /// Drop one page from the page store. Absent keys are ignored.
    pub fn invalidate(&self, key: &str) {
        let removed = self.stores.pages.delete(key);
        debug!(cache = self.stores.pages.name(), key, removed, "invalidated page");
    }

    /// Drop the cached site root listing.
    pub fn invalidate_index(&self) {
        self.invalidate(&self.index_key);
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderMap;
    use bytes::Bytes;

    use super::*;
    use crate::cache::CacheEntry;

    fn populated() -> (Arc<CacheStores>, CacheInvalidator) {
        let config = CacheConfig::default();
        let stores = Arc::new(CacheStores::new(&config));
        let entry = CacheEntry::new(&HeaderMap::new(), Bytes::from_static(b"cached"));
        stores.pages.put("/".to_string(), entry.clone());
        stores.pages.put("/post/1".to_string(), entry.clone());
        stores.pages.put("/post/2".to_string(), entry.clone());
        stores.static_assets.put("/static/site.css".to_string(), entry);
        let invalidator = CacheInvalidator::new(&config, stores.clone());
        (stores, invalidator)
    }

    #[test]
    fn invalidate_removes_only_the_named_page() {
        let (stores, invalidator) = populated();

        invalidator.invalidate("/post/1");

        assert!(!stores.pages.contains("/post/1"));
        assert!(stores.pages.contains("/post/2"));
        assert!(stores.pages.contains("/"));
        assert!(stores.static_assets.contains("/static/site.css"));
    }

    #[test]
    fn invalidate_index_removes_root() {
        let (stores, invalidator) = populated();

        invalidator.invalidate_index();

        assert!(!stores.pages.contains("/"));
        assert_eq!(stores.pages.len(), 2);
    }

    #[test]
    fn invalidation_is_idempotent() {
        let (stores, invalidator) = populated();

        invalidator.invalidate("/post/1");
        let after_first = stores.pages.len();
        invalidator.invalidate("/post/1");
        invalidator.invalidate("/never-cached");
        invalidator.invalidate_index();
        invalidator.invalidate_index();

        assert_eq!(after_first, 2);
        assert_eq!(stores.pages.len(), 1);
        assert!(stores.pages.contains("/post/2"));
    }
}
