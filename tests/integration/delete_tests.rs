//! Delete integration tests.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use super::test_utils::{create_test_png, test_router, MemoryBlobStore};

fn delete_request(id: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(format!("/delete/{id}"))
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_delete_success() {
    let store = Arc::new(
        MemoryBlobStore::new()
            .with_object("doomed.jpg", create_test_png(10, 10))
            .await,
    );
    let router = test_router(store.clone());

    let response = router.oneshot(delete_request("doomed.jpg")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let confirmation: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(confirmation["id"], "doomed.jpg");
    assert_eq!(confirmation["deleted"], true);

    assert!(!store.contains("doomed.jpg").await);
}

#[tokio::test]
async fn test_deleted_image_no_longer_delivers() {
    let store = Arc::new(
        MemoryBlobStore::new()
            .with_object("doomed.jpg", create_test_png(10, 10))
            .await,
    );
    let router = test_router(store);

    let response = router
        .clone()
        .oneshot(delete_request("doomed.jpg"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let get = router
        .oneshot(
            Request::builder()
                .uri("/doomed.jpg")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(get.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_unknown_id_is_404() {
    let router = test_router(Arc::new(MemoryBlobStore::new()));

    let response = router.oneshot(delete_request("never.jpg")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let error: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(error["error"], "not_found");
}

#[tokio::test]
async fn test_delete_requires_delete_method() {
    let store = Arc::new(
        MemoryBlobStore::new()
            .with_object("keep.jpg", create_test_png(10, 10))
            .await,
    );
    let router = test_router(store.clone());

    let request = Request::builder()
        .method("GET")
        .uri("/delete/keep.jpg")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert!(store.contains("keep.jpg").await);
}
