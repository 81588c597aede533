//! Admission policy for the response cache.
//!
//! Pure decisions only: whether a request may use the cache at all, which
//! store it belongs to, and what to do with the handler's response.

use axum::http::{HeaderMap, Method, StatusCode, Uri, header::CONTENT_LENGTH};

use super::config::CacheConfig;
use super::store::{PAGE_STORE, STATIC_STORE};

/// Classification of a request path by fixed prefixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    Static,
    Page,
    Excluded,
}

/// Positive store selected for an admitted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheClass {
    Static,
    Page,
}

impl CacheClass {
    pub fn store_name(self) -> &'static str {
        match self {
            CacheClass::Static => STATIC_STORE,
            CacheClass::Page => PAGE_STORE,
        }
    }
}

/// Why a request skipped the cache before reaching the handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bypass {
    Disabled,
    Method,
    ExcludedPrefix,
    QueryString,
    KnownNonCacheable,
}

impl Bypass {
    pub fn as_str(self) -> &'static str {
        match self {
            Bypass::Disabled => "disabled",
            Bypass::Method => "method",
            Bypass::ExcludedPrefix => "excluded_prefix",
            Bypass::QueryString => "query_string",
            Bypass::KnownNonCacheable => "non_cacheable",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Bypass(Bypass),
    Eligible(CacheClass),
}

/// What to do with the handler's response on a miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseVerdict {
    /// Read the body, bailing out once it exceeds `limit` bytes.
    Capture { limit: Option<usize> },
    /// Declared length already exceeds the ceiling; mark and pass through.
    Oversized { declared: u64 },
    /// Not a `200 OK`; pass through untouched.
    NotStorable,
}

/// Map a path to its route class.
pub fn classify(path: &str, config: &CacheConfig) -> RouteClass {
    if config
        .excluded_prefixes
        .iter()
        .any(|prefix| path.starts_with(prefix.as_str()))
    {
        RouteClass::Excluded
    } else if path.starts_with(config.static_prefix.as_str()) {
        RouteClass::Static
    } else {
        RouteClass::Page
    }
}

/// Decide whether a request may be served from or stored into the cache.
///
/// `is_non_cacheable` is consulted last so the negative cache is only read for
/// requests that would otherwise be eligible.
pub fn admit_request(
    config: &CacheConfig,
    method: &Method,
    uri: &Uri,
    is_non_cacheable: impl FnOnce(&str) -> bool,
) -> Admission {
    if !config.enabled {
        return Admission::Bypass(Bypass::Disabled);
    }

    if *method != Method::GET {
        return Admission::Bypass(Bypass::Method);
    }

    let path = uri.path();
    let class = match classify(path, config) {
        RouteClass::Excluded => return Admission::Bypass(Bypass::ExcludedPrefix),
        RouteClass::Static => CacheClass::Static,
        RouteClass::Page => CacheClass::Page,
    };

    if uri.query().is_some_and(|query| !query.is_empty()) {
        return Admission::Bypass(Bypass::QueryString);
    }

    if is_non_cacheable(path) {
        return Admission::Bypass(Bypass::KnownNonCacheable);
    }

    Admission::Eligible(class)
}

/// Decide how to treat a freshly produced response.
///
/// The declared-length check runs before the status check, so an oversized
/// static response is remembered as non-cacheable whatever its status.
pub fn admit_response(
    config: &CacheConfig,
    class: CacheClass,
    status: StatusCode,
    headers: &HeaderMap,
) -> ResponseVerdict {
    let limit = match class {
        CacheClass::Static => Some(config.static_body_limit_bytes),
        CacheClass::Page => None,
    };

    if let Some(limit) = limit
        && let Some(declared) = declared_length(headers)
        && declared > limit as u64
    {
        return ResponseVerdict::Oversized { declared };
    }

    if status != StatusCode::OK {
        return ResponseVerdict::NotStorable;
    }

    ResponseVerdict::Capture { limit }
}

fn declared_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
}
