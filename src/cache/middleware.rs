//! Response cache middleware.
//!
//! Serves eligible GET requests from the static-asset or page store and
//! records fresh `200 OK` responses on a miss. Anything the cache cannot
//! handle is passed through exactly as the inner handler produced it.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderValue, Request, StatusCode, header::CONTENT_TYPE},
    middleware::Next,
    response::Response,
};
use tracing::{debug, info, instrument};

use super::{
    CacheConfig, CacheStats, CacheStores,
    capture::{Captured, capture_body},
    policy::{Admission, Bypass, CacheClass, ResponseVerdict, admit_request, admit_response},
    store::{CacheEntry, CacheStore},
};

/// Shared cache state for the middleware.
#[derive(Clone)]
pub struct CacheState {
    pub config: Arc<CacheConfig>,
    pub stores: Arc<CacheStores>,
    pub stats: Arc<CacheStats>,
}

impl CacheState {
    pub fn new(config: CacheConfig, stores: Arc<CacheStores>) -> Self {
        Self {
            config: Arc::new(config),
            stores,
            stats: Arc::new(CacheStats::new()),
        }
    }

    fn store_for(&self, class: CacheClass) -> &CacheStore<CacheEntry> {
        match class {
            CacheClass::Static => &self.stores.static_assets,
            CacheClass::Page => &self.stores.pages,
        }
    }

    fn mark_non_cacheable(&self, key: &str, phase: &'static str) {
        self.stores.mark_non_cacheable(key);
        self.stats.record_rejected_after_handler(phase);
    }
}

/// Middleware for response caching.
///
/// The cache key is the request path. The inner handler runs at most once per
/// request, and a miss never delays the response beyond reading its body.
#[instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn response_cache_layer(
    State(cache): State<CacheState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let key = request.uri().path().to_string();

    let admission = admit_request(&cache.config, request.method(), request.uri(), |path| {
        cache.stores.is_non_cacheable(path)
    });

    let class = match admission {
        Admission::Eligible(class) => class,
        Admission::Bypass(reason) => {
            debug!(cache = "bypass", reason = reason.as_str(), "passing request through");
            match reason {
                Bypass::KnownNonCacheable => cache.stats.record_rejected_before_handler(),
                other => cache.stats.record_bypass(other.as_str()),
            }
            return next.run(request).await;
        }
    };

    let store = cache.store_for(class);

    if let Some(entry) = store.get(&key) {
        debug!(cache = store.name(), outcome = "hit", "serving cached response");
        cache.stats.record_hit(store.name());
        return build_response(entry);
    }

    debug!(
        cache = store.name(),
        outcome = "miss",
        "cache miss, executing handler"
    );
    cache.stats.record_miss(store.name());

    let response = next.run(request).await;

    let limit = match admit_response(&cache.config, class, response.status(), response.headers()) {
        ResponseVerdict::Capture { limit } => limit,
        ResponseVerdict::Oversized { declared } => {
            info!(
                cache = store.name(),
                declared_bytes = declared,
                limit_bytes = cache.config.static_body_limit_bytes,
                "declared length exceeds limit, marking path non-cacheable"
            );
            cache.mark_non_cacheable(&key, "declared_length");
            return response;
        }
        ResponseVerdict::NotStorable => {
            debug!(
                cache = store.name(),
                status = response.status().as_u16(),
                "response not storable"
            );
            return response;
        }
    };

    let (parts, body) = response.into_parts();

    match capture_body(body, limit).await {
        Captured::Complete(bytes) => {
            let entry = CacheEntry::new(&parts.headers, bytes.clone());
            if let Some(evicted) = store.put(key, entry) {
                debug!(cache = store.name(), evicted = %evicted, "evicted least recently used entry");
            }
            cache.stats.record_stored();
            debug!(cache = store.name(), bytes = bytes.len(), "caching response");
            Response::from_parts(parts, Body::from(bytes))
        }
        Captured::Overflow(body) => {
            info!(
                cache = store.name(),
                limit_bytes = cache.config.static_body_limit_bytes,
                "body exceeded limit while reading, marking path non-cacheable"
            );
            cache.mark_non_cacheable(&key, "streaming");
            Response::from_parts(parts, body)
        }
        Captured::Failed(body) => {
            debug!(cache = store.name(), "response body failed, not caching");
            Response::from_parts(parts, body)
        }
    }
}

/// Build a response from a cached entry.
fn build_response(entry: CacheEntry) -> Response {
    let mut response = Response::new(Body::from(entry.body));
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    for (name, value) in entry.headers {
        headers.append(name, value);
    }
    if !headers.contains_key(CONTENT_TYPE)
        && let Some(media_type) = entry.media_type
    {
        headers.insert(CONTENT_TYPE, media_type);
    }

    response
}
