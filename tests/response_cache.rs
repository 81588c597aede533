use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::{
    Router,
    body::{Body, Bytes},
    http::{HeaderValue, Method, Request, StatusCode, header},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use futures::{future::join_all, stream};
use folio::cache::{CacheConfig, CacheState, CacheStores, response_cache_layer};
use http_body_util::BodyExt;
use tower::ServiceExt;

const LARGE_BODY_LEN: usize = 32;

fn cache_with(config: CacheConfig) -> CacheState {
    let stores = Arc::new(CacheStores::new(&config));
    CacheState::new(config, stores)
}

/// Router whose every handler bumps `calls`, wrapped by the response cache.
fn app(cache: CacheState, calls: Arc<AtomicUsize>) -> Router {
    let page_calls = calls.clone();
    let static_calls = calls.clone();
    let sized_calls = calls.clone();
    let streamed_calls = calls.clone();
    let missing_calls = calls.clone();

    Router::new()
        .route(
            "/{page}",
            get(move || {
                let calls = page_calls.clone();
                async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    (
                        [
                            (header::CONTENT_TYPE, "text/html; charset=utf-8"),
                            (header::CACHE_CONTROL, "public"),
                        ],
                        format!("<p>render {n}</p>"),
                    )
                        .into_response()
                }
            })
            .post(move || {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    StatusCode::OK
                }
            }),
        )
        .route(
            "/static/site.css",
            get(move || {
                let calls = static_calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    ([(header::CONTENT_TYPE, "text/css")], "body{}").into_response()
                }
            }),
        )
        .route(
            "/static/sized.bin",
            get(move || {
                let calls = sized_calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    let mut response = Response::new(Body::from(large_body()));
                    response.headers_mut().insert(
                        header::CONTENT_LENGTH,
                        HeaderValue::from(LARGE_BODY_LEN as u64),
                    );
                    response
                }
            }),
        )
        .route(
            "/static/streamed.bin",
            get(move || {
                let calls = streamed_calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    let body = large_body();
                    let chunks: Vec<Result<Bytes, std::io::Error>> = body
                        .chunks(5)
                        .map(|chunk| Ok(Bytes::copy_from_slice(chunk)))
                        .collect();
                    Response::new(Body::from_stream(stream::iter(chunks)))
                }
            }),
        )
        .route(
            "/gone/{page}",
            get(move || {
                let calls = missing_calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    (StatusCode::NOT_FOUND, "missing")
                }
            }),
        )
        .layer(middleware::from_fn_with_state(cache, response_cache_layer))
}

fn large_body() -> Vec<u8> {
    (0..LARGE_BODY_LEN as u8).collect()
}

async fn send(app: &Router, method: Method, uri: &str) -> Response {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("request should build");
    app.clone()
        .oneshot(request)
        .await
        .expect("router should respond")
}

async fn body_bytes(response: Response) -> Bytes {
    response
        .into_body()
        .collect()
        .await
        .expect("body should collect")
        .to_bytes()
}

fn assert_rendered_page(body: &Bytes) {
    let text = std::str::from_utf8(body).expect("utf-8 body");
    let n = text
        .strip_prefix("<p>render ")
        .and_then(|rest| rest.strip_suffix("</p>"))
        .unwrap_or_else(|| panic!("torn body: {text:?}"));
    assert!(n.parse::<usize>().is_ok(), "torn body: {text:?}");
}

/// Fire every uri at once on the runtime's worker threads.
async fn concurrent_gets(app: &Router, cache: &CacheState, uris: Vec<String>) -> Vec<Bytes> {
    let capacity = cache.stores.pages.capacity();
    let tasks = uris.into_iter().map(|uri| {
        let app = app.clone();
        let cache = cache.clone();
        tokio::spawn(async move {
            let response = send(&app, Method::GET, &uri).await;
            assert_eq!(response.status(), StatusCode::OK, "{uri}");
            let body = body_bytes(response).await;
            assert!(cache.stores.pages.len() <= capacity);
            body
        })
    });

    join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.expect("request task should not panic"))
        .collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_keep_bodies_intact_and_store_bounded() {
    const CAPACITY: usize = 8;
    let cache = cache_with(CacheConfig {
        page_capacity: CAPACITY,
        ..CacheConfig::default()
    });
    let calls = Arc::new(AtomicUsize::new(0));
    let app = app(cache.clone(), calls.clone());

    // Concurrent misses on one key: every caller gets a whole page and the
    // last store wins.
    let shared = concurrent_gets(&app, &cache, vec!["/shared".to_string(); 32]).await;
    shared.iter().for_each(assert_rendered_page);
    assert!(cache.stores.pages.contains("/shared"));

    let before = calls.load(Ordering::SeqCst);
    let replay = body_bytes(send(&app, Method::GET, "/shared").await).await;
    assert_eq!(calls.load(Ordering::SeqCst), before, "expected a hit");
    assert!(shared.contains(&replay));

    // Distinct keys racing for a small store.
    let distinct = (0..64).map(|i| format!("/page-{i}")).collect();
    let bodies = concurrent_gets(&app, &cache, distinct).await;
    assert_eq!(bodies.len(), 64);
    bodies.iter().for_each(assert_rendered_page);
    assert_eq!(cache.stores.pages.len(), CAPACITY);
}

#[tokio::test]
async fn repeated_page_request_is_served_from_cache() {
    let cache = cache_with(CacheConfig::default());
    let calls = Arc::new(AtomicUsize::new(0));
    let app = app(cache.clone(), calls.clone());

    let first = send(&app, Method::GET, "/about").await;
    let first_headers = first.headers().clone();
    let first_body = body_bytes(first).await;

    let second = send(&app, Method::GET, "/about").await;
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(
        second.headers().get(header::CONTENT_TYPE),
        first_headers.get(header::CONTENT_TYPE)
    );
    assert_eq!(
        second.headers().get(header::CACHE_CONTROL),
        first_headers.get(header::CACHE_CONTROL)
    );
    let second_body = body_bytes(second).await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(first_body, second_body);
    assert_eq!(first_body, Bytes::from_static(b"<p>render 0</p>"));
    assert!(cache.stores.pages.contains("/about"));

    let stats = cache.stats.snapshot();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.stored, 1);
}

#[tokio::test]
async fn ineligible_requests_always_reach_the_handler() {
    let cache = cache_with(CacheConfig::default());
    let calls = Arc::new(AtomicUsize::new(0));
    let app = app(cache.clone(), calls.clone());

    for _ in 0..2 {
        let response = send(&app, Method::POST, "/about").await;
        assert_eq!(response.status(), StatusCode::OK);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    for _ in 0..2 {
        send(&app, Method::GET, "/about?draft=1").await;
    }
    assert_eq!(calls.load(Ordering::SeqCst), 4);

    for _ in 0..2 {
        send(&app, Method::GET, "/admin").await;
    }
    assert_eq!(calls.load(Ordering::SeqCst), 6);

    assert!(cache.stores.pages.is_empty());
    assert_eq!(cache.stats.snapshot().bypassed, 6);
}

#[tokio::test]
async fn least_recently_used_page_is_evicted() {
    let cache = cache_with(CacheConfig {
        page_capacity: 2,
        ..CacheConfig::default()
    });
    let calls = Arc::new(AtomicUsize::new(0));
    let app = app(cache.clone(), calls.clone());

    for uri in ["/a", "/b", "/a", "/c"] {
        let response = send(&app, Method::GET, uri).await;
        assert_eq!(response.status(), StatusCode::OK);
        body_bytes(response).await;
    }

    assert!(cache.stores.pages.contains("/a"));
    assert!(cache.stores.pages.contains("/c"));
    assert!(!cache.stores.pages.contains("/b"));
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    send(&app, Method::GET, "/b").await;
    assert_eq!(calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn small_static_asset_is_cached_in_static_store() {
    let cache = cache_with(CacheConfig::default());
    let calls = Arc::new(AtomicUsize::new(0));
    let app = app(cache.clone(), calls.clone());

    body_bytes(send(&app, Method::GET, "/static/site.css").await).await;
    let response = send(&app, Method::GET, "/static/site.css").await;

    assert_eq!(response.headers().get(header::CONTENT_TYPE).unwrap(), "text/css");
    assert_eq!(body_bytes(response).await, Bytes::from_static(b"body{}"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(cache.stores.static_assets.contains("/static/site.css"));
    assert!(cache.stores.pages.is_empty());
}

#[tokio::test]
async fn oversized_declared_length_passes_through_and_is_remembered() {
    let cache = cache_with(CacheConfig {
        static_body_limit_bytes: 8,
        ..CacheConfig::default()
    });
    let calls = Arc::new(AtomicUsize::new(0));
    let app = app(cache.clone(), calls.clone());

    let first = send(&app, Method::GET, "/static/sized.bin").await;
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(body_bytes(first).await.as_ref(), large_body().as_slice());
    assert!(cache.stores.is_non_cacheable("/static/sized.bin"));

    let second = send(&app, Method::GET, "/static/sized.bin").await;
    assert_eq!(body_bytes(second).await.as_ref(), large_body().as_slice());

    let stats = cache.stats.snapshot();
    assert_eq!(stats.rejected_after_handler, 1);
    assert_eq!(stats.rejected_before_handler, 1);
    assert_eq!(stats.misses, 1);
    assert!(cache.stores.static_assets.is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn streamed_overflow_is_delivered_byte_for_byte() {
    let cache = cache_with(CacheConfig {
        static_body_limit_bytes: 12,
        ..CacheConfig::default()
    });
    let calls = Arc::new(AtomicUsize::new(0));
    let app = app(cache.clone(), calls.clone());

    let first = send(&app, Method::GET, "/static/streamed.bin").await;
    assert!(first.headers().get(header::CONTENT_LENGTH).is_none());
    assert_eq!(body_bytes(first).await.as_ref(), large_body().as_slice());
    assert!(cache.stores.is_non_cacheable("/static/streamed.bin"));

    let second = send(&app, Method::GET, "/static/streamed.bin").await;
    assert_eq!(body_bytes(second).await.as_ref(), large_body().as_slice());

    let stats = cache.stats.snapshot();
    assert_eq!(stats.rejected_after_handler, 1);
    assert_eq!(stats.rejected_before_handler, 1);
    assert!(cache.stores.static_assets.is_empty());
}

#[tokio::test]
async fn body_exactly_at_limit_is_cached() {
    let cache = cache_with(CacheConfig {
        static_body_limit_bytes: LARGE_BODY_LEN,
        ..CacheConfig::default()
    });
    let calls = Arc::new(AtomicUsize::new(0));
    let app = app(cache.clone(), calls.clone());

    body_bytes(send(&app, Method::GET, "/static/streamed.bin").await).await;
    let cached = send(&app, Method::GET, "/static/streamed.bin").await;

    assert_eq!(body_bytes(cached).await.as_ref(), large_body().as_slice());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(!cache.stores.is_non_cacheable("/static/streamed.bin"));
}

#[tokio::test]
async fn error_responses_are_never_stored() {
    let cache = cache_with(CacheConfig::default());
    let calls = Arc::new(AtomicUsize::new(0));
    let app = app(cache.clone(), calls.clone());

    for _ in 0..2 {
        let response = send(&app, Method::GET, "/gone/page").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_bytes(response).await, Bytes::from_static(b"missing"));
    }

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(cache.stores.pages.is_empty());
    assert!(!cache.stores.is_non_cacheable("/gone/page"));
}

#[tokio::test]
async fn disabled_cache_is_transparent() {
    let cache = cache_with(CacheConfig {
        enabled: false,
        ..CacheConfig::default()
    });
    let calls = Arc::new(AtomicUsize::new(0));
    let app = app(cache.clone(), calls.clone());

    let first = body_bytes(send(&app, Method::GET, "/about").await).await;
    let second = body_bytes(send(&app, Method::GET, "/about").await).await;

    assert_ne!(first, second);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(cache.stores.pages.is_empty());
}
