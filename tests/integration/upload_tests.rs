//! Upload ingest integration tests.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use super::test_utils::{
    create_test_jpeg, create_test_png, test_router, upload_request, MemoryBlobStore,
    MULTIPART_BOUNDARY, TEST_MAX_UPLOAD,
};

#[tokio::test]
async fn test_upload_success() {
    let store = Arc::new(MemoryBlobStore::new());
    let router = test_router(store.clone());

    let response = router
        .oneshot(upload_request(&create_test_png(100, 400), "photo.png"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let receipt: serde_json::Value = serde_json::from_slice(&body).unwrap();

    let id = receipt["id"].as_str().unwrap();
    assert!(id.ends_with(".jpg"));
    assert_eq!(id.len(), 24 + 4); // 12 random bytes, hex encoded, plus extension
    assert_eq!(receipt["content_type"], "image/jpeg");
    assert_eq!(receipt["location"], format!("mem://{id}"));

    // Stored object is the normalized JPEG: 800px tall, aspect kept.
    let stored = store.object(id).await.unwrap();
    let img = image::load_from_memory(&stored).unwrap();
    assert_eq!(img.height(), 800);
    assert_eq!(img.width(), 200);
    assert!(stored.starts_with(&[0xFF, 0xD8]));
}

#[tokio::test]
async fn test_uploaded_image_is_deliverable() {
    let store = Arc::new(MemoryBlobStore::new());
    let router = test_router(store);

    let response = router
        .clone()
        .oneshot(upload_request(&create_test_jpeg(200, 400, 90), "a.jpg"))
        .await
        .unwrap();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let receipt: serde_json::Value = serde_json::from_slice(&body).unwrap();
    let id = receipt["id"].as_str().unwrap();

    let delivered = router
        .oneshot(
            Request::builder()
                .uri(format!("/{id}?width=50"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(delivered.status(), StatusCode::OK);
    assert_eq!(
        delivered.headers().get("content-type").unwrap(),
        "image/jpeg"
    );
}

#[tokio::test]
async fn test_upload_ids_are_unique() {
    let store = Arc::new(MemoryBlobStore::new());
    let router = test_router(store.clone());

    for _ in 0..3 {
        let response = router
            .clone()
            .oneshot(upload_request(&create_test_png(20, 20), "same.png"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
    assert_eq!(store.keys().await.len(), 3);
}

#[tokio::test]
async fn test_oversize_upload_is_413() {
    let store = Arc::new(MemoryBlobStore::new());
    let router = test_router(store.clone());

    // Valid PNG header followed by padding, over the configured limit.
    let mut payload = create_test_png(10, 10);
    payload.resize(TEST_MAX_UPLOAD + 1, 0);

    let response = router
        .oneshot(upload_request(&payload, "big.png"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let error: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(error["error"], "payload_too_large");
    assert!(store.keys().await.is_empty());
}

#[tokio::test]
async fn test_upload_beyond_body_limit_is_413() {
    let store = Arc::new(MemoryBlobStore::new());
    let router = test_router(store.clone());

    // Large enough that the route's body limit cuts the read short,
    // well before the ingest size check can run.
    let mut payload = create_test_png(10, 10);
    payload.resize(TEST_MAX_UPLOAD + 128 * 1024, 0);

    let response = router
        .oneshot(upload_request(&payload, "huge.png"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let error: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(error["error"], "payload_too_large");
    assert!(store.keys().await.is_empty());
}

#[tokio::test]
async fn test_non_image_upload_is_400() {
    let store = Arc::new(MemoryBlobStore::new());
    let router = test_router(store.clone());

    let response = router
        .oneshot(upload_request(b"definitely not an image", "file.txt"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let error: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(error["error"], "unsupported_upload");
    assert!(store.keys().await.is_empty());
}

#[tokio::test]
async fn test_missing_upload_field_is_400() {
    let store = Arc::new(MemoryBlobStore::new());
    let router = test_router(store);

    // A multipart body with only the "type" field.
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(b"Content-Disposition: form-data; name=\"type\"\r\n\r\njpg\r\n");
    body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}--\r\n").as_bytes());

    let request = Request::builder()
        .method("POST")
        .uri("/upload")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let error: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(error["error"], "invalid_upload");
}

#[tokio::test]
async fn test_non_multipart_upload_rejected() {
    let router = test_router(Arc::new(MemoryBlobStore::new()));

    let request = Request::builder()
        .method("POST")
        .uri("/upload")
        .header("content-type", "application/json")
        .body(Body::from("{}"))
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert!(response.status().is_client_error());
}
