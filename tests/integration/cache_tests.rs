//! Result cache behavior through the HTTP surface.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use imagepress::create_router;
use imagepress::delivery::{ConcurrencyLimiter, ImageService, ResultCache};
use imagepress::server::RouterConfig;
use imagepress::store::BlobStore;

use super::test_utils::{create_test_png, test_router, MemoryBlobStore, TEST_MAX_UPLOAD};

#[tokio::test]
async fn test_second_request_is_cache_hit() {
    let store = Arc::new(
        MemoryBlobStore::new()
            .with_object("pic.png", create_test_png(30, 30))
            .await,
    );
    let router = test_router(store.clone());

    let first = router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/pic.png?width=10")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(first.headers().get("x-cache-hit").unwrap(), "false");

    let second = router
        .oneshot(
            Request::builder()
                .uri("/pic.png?width=10")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(second.headers().get("x-cache-hit").unwrap(), "true");

    // The source was fetched exactly once.
    assert_eq!(store.get_count(), 1);
}

#[tokio::test]
async fn test_different_params_are_different_entries() {
    let store = Arc::new(
        MemoryBlobStore::new()
            .with_object("pic.png", create_test_png(30, 30))
            .await,
    );
    let router = test_router(store.clone());

    for uri in ["/pic.png?width=10", "/pic.png?width=20"] {
        let response = router
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.headers().get("x-cache-hit").unwrap(), "false");
    }
    assert_eq!(store.get_count(), 2);
}

#[tokio::test]
async fn test_disabled_cache_recomputes() {
    let store = Arc::new(
        MemoryBlobStore::new()
            .with_object("pic.png", create_test_png(30, 30))
            .await,
    );
    let service = ImageService::new(
        store.clone(),
        Arc::new(ResultCache::new(0)),
        Arc::new(ConcurrencyLimiter::new(2)),
        TEST_MAX_UPLOAD,
    );
    let router = create_router(service, RouterConfig::default());

    for _ in 0..2 {
        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/pic.png?width=10")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get("x-cache-hit").unwrap(), "false");
    }
    assert_eq!(store.get_count(), 2);
}

#[tokio::test]
async fn test_cached_responses_are_identical() {
    let store = Arc::new(
        MemoryBlobStore::new()
            .with_object("pic.png", create_test_png(30, 30))
            .await,
    );
    let router = test_router(store);

    let mut bodies = Vec::new();
    for _ in 0..2 {
        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/pic.png?width=15&format=jpeg")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        bodies.push(response.into_body().collect().await.unwrap().to_bytes());
    }
    assert_eq!(bodies[0], bodies[1]);
}

#[tokio::test]
async fn test_failed_requests_are_not_cached() {
    let store = Arc::new(MemoryBlobStore::new());
    let router = test_router(store.clone());

    let miss = router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/late.png")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(miss.status(), StatusCode::NOT_FOUND);

    // The object appears afterwards; the next request must succeed.
    store
        .put(
            "late.png",
            bytes::Bytes::from(create_test_png(12, 12)),
            "image/png",
        )
        .await
        .unwrap();

    let hit = router
        .oneshot(
            Request::builder()
                .uri("/late.png")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(hit.status(), StatusCode::OK);
}
