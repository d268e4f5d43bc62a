//! Test utilities for integration tests.
//!
//! Provides an in-memory [`BlobStore`], sample image builders and
//! helpers for assembling routers and multipart upload bodies.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use axum::Router;
use bytes::Bytes;
use image::codecs::gif::{GifEncoder, Repeat};
use image::codecs::jpeg::JpegEncoder;
use image::{Delay, DynamicImage, Frame, ImageFormat, Rgba, RgbaImage};
use tokio::sync::RwLock;

use imagepress::delivery::{ConcurrencyLimiter, ImageService, ResultCache};
use imagepress::error::StoreError;
use imagepress::server::RouterConfig;
use imagepress::store::BlobStore;
use imagepress::create_router;

// =============================================================================
// In-Memory Blob Store with Request Tracking
// =============================================================================

/// An in-memory store that tracks how often each object is fetched.
///
/// Useful for verifying cache and single-flight behavior.
pub struct MemoryBlobStore {
    objects: RwLock<HashMap<String, Bytes>>,
    get_count: AtomicUsize,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            get_count: AtomicUsize::new(0),
        }
    }

    pub async fn with_object(self, key: impl Into<String>, data: Vec<u8>) -> Self {
        self.objects
            .write()
            .await
            .insert(key.into(), Bytes::from(data));
        self
    }

    pub fn get_count(&self) -> usize {
        self.get_count.load(Ordering::SeqCst)
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.objects.read().await.contains_key(key)
    }

    pub async fn object(&self, key: &str) -> Option<Bytes> {
        self.objects.read().await.get(key).cloned()
    }

    pub async fn keys(&self) -> Vec<String> {
        self.objects.read().await.keys().cloned().collect()
    }
}

impl Default for MemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, key: &str, data: Bytes, _content_type: &str) -> Result<String, StoreError> {
        self.objects.write().await.insert(key.to_string(), data);
        Ok(format!("mem://{key}"))
    }

    async fn get(&self, key: &str) -> Result<Bytes, StoreError> {
        self.get_count.fetch_add(1, Ordering::SeqCst);
        self.objects
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.objects.write().await.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.objects.read().await.contains_key(key))
    }
}

// =============================================================================
// Router Assembly
// =============================================================================

pub const TEST_MAX_UPLOAD: usize = 256 * 1024;

/// Build a router over the given store with test-friendly settings.
pub fn test_router(store: Arc<MemoryBlobStore>) -> Router {
    let service = ImageService::new(
        store,
        Arc::new(ResultCache::new(16 * 1024 * 1024)),
        Arc::new(ConcurrencyLimiter::new(4)),
        TEST_MAX_UPLOAD,
    );
    create_router(
        service,
        RouterConfig {
            max_upload_size: TEST_MAX_UPLOAD,
            ..RouterConfig::default()
        },
    )
}

// =============================================================================
// Sample Image Builders
// =============================================================================

/// Create a PNG with a deterministic gradient pattern.
pub fn create_test_png(width: u32, height: u32) -> Vec<u8> {
    let img = DynamicImage::ImageRgba8(RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8, 255])
    }));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}

/// Create a JPEG with a flat color.
pub fn create_test_jpeg(width: u32, height: u32, quality: u8) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba([80, 140, 200, 255]));
    let mut buf = Cursor::new(Vec::new());
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality);
    encoder
        .encode_image(&DynamicImage::ImageRgba8(img).to_rgb8())
        .unwrap();
    buf.into_inner()
}

/// Create a small animated GIF with the given number of frames.
pub fn create_test_gif(frames: usize, width: u32, height: u32) -> Vec<u8> {
    let mut encoded = Vec::new();
    {
        let mut encoder = GifEncoder::new(&mut encoded);
        encoder.set_repeat(Repeat::Infinite).unwrap();
        for i in 0..frames {
            let shade = ((i * 60) % 256) as u8;
            let buffer = RgbaImage::from_pixel(width, height, Rgba([shade, 20, 20, 255]));
            encoder
                .encode_frame(Frame::from_parts(
                    buffer,
                    0,
                    0,
                    Delay::from_saturating_duration(std::time::Duration::from_millis(80)),
                ))
                .unwrap();
        }
    }
    encoded
}

/// Decode a response body and return its dimensions.
pub fn decoded_dimensions(data: &[u8]) -> (u32, u32) {
    let img = image::load_from_memory(data).unwrap();
    (img.width(), img.height())
}

// =============================================================================
// Multipart Helpers
// =============================================================================

pub const MULTIPART_BOUNDARY: &str = "----imagepress-test-boundary";

/// Build a multipart/form-data body with an `uploadFile` field and an
/// accompanying legacy `type` field.
pub fn multipart_upload_body(payload: &[u8], file_name: &str) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"uploadFile\"; filename=\"{file_name}\"\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(payload);
    body.extend_from_slice(format!("\r\n--{MULTIPART_BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(b"Content-Disposition: form-data; name=\"type\"\r\n\r\njpg\r\n");
    body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}--\r\n").as_bytes());
    body
}

/// Build a POST /upload request carrying the payload as `uploadFile`.
pub fn upload_request(payload: &[u8], file_name: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/upload")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}"),
        )
        .body(Body::from(multipart_upload_body(payload, file_name)))
        .unwrap()
}
