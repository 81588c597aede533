//! Cache configuration.
//!
//! Controls the response cache stores and admission limits via `folio.toml`.

use std::num::NonZeroUsize;

use serde::Deserialize;

// Default values for cache configuration
const DEFAULT_STATIC_CAPACITY: usize = 1000;
const DEFAULT_PAGE_CAPACITY: usize = 1000;
const DEFAULT_NON_CACHEABLE_CAPACITY: usize = 10_000;
const DEFAULT_STATIC_BODY_LIMIT_BYTES: usize = 1024 * 1024;
const DEFAULT_STATIC_PREFIX: &str = "/static/";
const DEFAULT_INDEX_PATH: &str = "/";
const DEFAULT_EXCLUDED_PREFIXES: [&str; 4] = ["/admin", "/login", "/logout", "/api"];

/// Response cache configuration from `folio.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Enable the response cache.
    pub enabled: bool,
    /// Maximum entries in the static-asset store.
    pub static_capacity: usize,
    /// Maximum entries in the page store.
    pub page_capacity: usize,
    /// Maximum paths remembered as non-cacheable.
    pub non_cacheable_capacity: usize,
    /// Largest static body (bytes) admitted into the cache.
    pub static_body_limit_bytes: usize,
    /// Path prefix classifying a request as a static asset.
    pub static_prefix: String,
    /// Path prefixes that never touch the cache (admin, login/logout, API).
    pub excluded_prefixes: Vec<String>,
    /// Cache key of the site root listing.
    pub index_path: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            static_capacity: DEFAULT_STATIC_CAPACITY,
            page_capacity: DEFAULT_PAGE_CAPACITY,
            non_cacheable_capacity: DEFAULT_NON_CACHEABLE_CAPACITY,
            static_body_limit_bytes: DEFAULT_STATIC_BODY_LIMIT_BYTES,
            static_prefix: DEFAULT_STATIC_PREFIX.to_string(),
            excluded_prefixes: DEFAULT_EXCLUDED_PREFIXES
                .iter()
                .map(|prefix| prefix.to_string())
                .collect(),
            index_path: DEFAULT_INDEX_PATH.to_string(),
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            static_capacity: settings.static_capacity,
            page_capacity: settings.page_capacity,
            non_cacheable_capacity: settings.non_cacheable_capacity,
            static_body_limit_bytes: settings.static_body_limit_bytes,
            ..Default::default()
        }
    }
}

impl CacheConfig {
    /// Returns the static store capacity as NonZeroUsize, clamping to 1 if zero.
    pub fn static_capacity_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.static_capacity).unwrap_or(NonZeroUsize::MIN)
    }

    /// Returns the page store capacity as NonZeroUsize, clamping to 1 if zero.
    pub fn page_capacity_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.page_capacity).unwrap_or(NonZeroUsize::MIN)
    }

    /// Returns the non-cacheable marker capacity as NonZeroUsize, clamping to 1 if zero.
    pub fn non_cacheable_capacity_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.non_cacheable_capacity).unwrap_or(NonZeroUsize::MIN)
    }
}
