//! Folio response cache.
//!
//! Sits in front of every route and keeps three bounded LRU stores:
//!
//! - **static-assets**: bodies under `/static/`, capped at a configurable size
//! - **pages**: rendered pages, invalidated by post mutations
//! - **non-cacheable**: paths known to produce oversized static bodies
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! enabled = true
//! static_capacity = 1000
//! page_capacity = 1000
//! non_cacheable_capacity = 10000
//! static_body_limit_bytes = 1048576
//! ```

mod capture;
mod config;
mod invalidate;
mod lock;
mod middleware;
mod policy;
mod stats;
mod store;

pub use capture::{Captured, capture_body};
pub use config::CacheConfig;
pub use invalidate::CacheInvalidator;
pub use middleware::{CacheState, response_cache_layer};
pub use policy::{
    Admission, Bypass, CacheClass, ResponseVerdict, RouteClass, admit_request, admit_response,
    classify,
};
pub use stats::{
    CacheStats, CacheStatsSnapshot, METRIC_CACHE_BYPASS_TOTAL, METRIC_CACHE_EVICT_TOTAL,
    METRIC_CACHE_HIT_TOTAL, METRIC_CACHE_MISS_TOTAL, METRIC_CACHE_NON_CACHEABLE_TOTAL,
};
pub use store::{CacheEntry, CacheStore, CacheStores, NON_CACHEABLE_STORE, PAGE_STORE, STATIC_STORE};
