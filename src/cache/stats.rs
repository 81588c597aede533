//! Cache outcome counters.
//!
//! Every outcome is recorded twice: as a `metrics` counter for exporters and in
//! an in-process `CacheStats` snapshot that tests and the admin dashboard read.

use std::sync::atomic::{AtomicU64, Ordering};

use metrics::counter;

pub const METRIC_CACHE_HIT_TOTAL: &str = "folio_cache_hit_total";
pub const METRIC_CACHE_MISS_TOTAL: &str = "folio_cache_miss_total";
pub const METRIC_CACHE_EVICT_TOTAL: &str = "folio_cache_evict_total";
pub const METRIC_CACHE_BYPASS_TOTAL: &str = "folio_cache_bypass_total";
pub const METRIC_CACHE_NON_CACHEABLE_TOTAL: &str = "folio_cache_non_cacheable_total";

#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    stored: AtomicU64,
    bypassed: AtomicU64,
    rejected_before_handler: AtomicU64,
    rejected_after_handler: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub stored: u64,
    pub bypassed: u64,
    /// Requests short-circuited by a non-cacheable marker.
    pub rejected_before_handler: u64,
    /// Responses found oversized after the handler ran.
    pub rejected_after_handler: u64,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_hit(&self, store: &'static str) {
        self.hits.fetch_add(1, Ordering::Relaxed);
        counter!(METRIC_CACHE_HIT_TOTAL, "store" => store).increment(1);
    }

    pub(crate) fn record_miss(&self, store: &'static str) {
        self.misses.fetch_add(1, Ordering::Relaxed);
        counter!(METRIC_CACHE_MISS_TOTAL, "store" => store).increment(1);
    }

    pub(crate) fn record_stored(&self) {
        self.stored.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_bypass(&self, reason: &'static str) {
        self.bypassed.fetch_add(1, Ordering::Relaxed);
        counter!(METRIC_CACHE_BYPASS_TOTAL, "reason" => reason).increment(1);
    }

    pub(crate) fn record_rejected_before_handler(&self) {
        self.rejected_before_handler.fetch_add(1, Ordering::Relaxed);
        counter!(METRIC_CACHE_BYPASS_TOTAL, "reason" => "non_cacheable").increment(1);
    }

    pub(crate) fn record_rejected_after_handler(&self, phase: &'static str) {
        self.rejected_after_handler.fetch_add(1, Ordering::Relaxed);
        counter!(METRIC_CACHE_NON_CACHEABLE_TOTAL, "phase" => phase).increment(1);
    }

    pub fn snapshot(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            stored: self.stored.load(Ordering::Relaxed),
            bypassed: self.bypassed.load(Ordering::Relaxed),
            rejected_before_handler: self.rejected_before_handler.load(Ordering::Relaxed),
            rejected_after_handler: self.rejected_after_handler.load(Ordering::Relaxed),
        }
    }
}
