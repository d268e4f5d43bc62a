//! The delivery service: ties store, pipeline, cache and limiter
//! together behind the three operations the HTTP layer exposes.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use rand::RngCore;
use tracing::{debug, info, warn};

use crate::error::{DeleteError, DeliverError, ProcessError, StoreError, UploadError};
use crate::pipeline::ImageProcessor;
use crate::store::BlobStore;
use crate::transform::TransformRequest;

use super::cache::ResultCache;
use super::limiter::ConcurrencyLimiter;

/// Length in bytes of the random portion of an ingest identifier.
const ID_BYTES: usize = 12;

/// How often the delete path re-checks the store for disappearance.
const DELETE_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// How long the delete path waits for the store to confirm.
const DELETE_CONFIRM_WINDOW: Duration = Duration::from_secs(5);

/// A transform result ready to be written to an HTTP response.
#[derive(Debug, Clone)]
pub struct DeliveredImage {
    pub data: Bytes,
    pub content_type: &'static str,
    pub etag: String,
    pub cache_hit: bool,
}

/// Outcome of a successful upload ingest.
#[derive(Debug, Clone)]
pub struct IngestReceipt {
    pub id: String,
    pub location: String,
    pub content_type: &'static str,
}

/// Core application service behind the HTTP handlers.
pub struct ImageService<B> {
    store: Arc<B>,
    processor: Arc<ImageProcessor>,
    cache: Arc<ResultCache>,
    limiter: Arc<ConcurrencyLimiter>,
    max_upload_size: usize,
}

impl<B: BlobStore> ImageService<B> {
    pub fn new(
        store: Arc<B>,
        cache: Arc<ResultCache>,
        limiter: Arc<ConcurrencyLimiter>,
        max_upload_size: usize,
    ) -> Self {
        Self {
            store,
            processor: Arc::new(ImageProcessor::new()),
            cache,
            limiter,
            max_upload_size,
        }
    }

    /// The ETag a request would produce, without running the pipeline.
    ///
    /// Used to answer `If-None-Match` before any fetch or compute.
    pub fn etag_for(&self, request: &TransformRequest) -> String {
        request.cache_key().etag()
    }

    /// Deliver the transformed variant described by `request`.
    ///
    /// Cached results are served directly; otherwise the computation is
    /// shared with any concurrent request for the same variant. The
    /// fetch-and-process stage runs under a concurrency permit.
    pub async fn deliver(&self, request: TransformRequest) -> Result<DeliveredImage, DeliverError> {
        let key = request.cache_key();
        let etag = key.etag();

        let store = self.store.clone();
        let processor = self.processor.clone();
        let limiter = self.limiter.clone();
        let source_id = request.source_id.clone();

        let compute = async move {
            let _permit = limiter.acquire().await;
            let source = store.get(&request.source_id).await?;
            let processed = processor.process(&source, &request)?;
            Ok(processed)
        };

        let (result, cache_hit) = self.cache.get_or_compute(key, compute).await;
        let processed = result?;

        debug!(
            source_id = %source_id,
            bytes = processed.len(),
            cache_hit,
            "delivered variant"
        );

        Ok(DeliveredImage {
            data: processed.data,
            content_type: processed.content_type,
            etag,
            cache_hit,
        })
    }

    /// Ingest an uploaded image: normalize it and store it under a
    /// fresh random identifier.
    pub async fn ingest(&self, payload: Bytes) -> Result<IngestReceipt, UploadError> {
        if payload.len() > self.max_upload_size {
            return Err(UploadError::PayloadTooLarge {
                size: payload.len(),
                max: self.max_upload_size,
            });
        }

        let normalized = self.processor.normalize(&payload).map_err(|e| match e {
            ProcessError::UnsupportedFormat { reason } => UploadError::UnsupportedFormat { reason },
            other => UploadError::Process(other),
        })?;

        // Normalization always emits JPEG, so the key always says so.
        let id = format!("{}.jpg", random_id());

        match self
            .store
            .put(&id, normalized.data.clone(), normalized.content_type)
            .await
        {
            Ok(location) => {
                info!(id = %id, bytes = normalized.len(), "ingested upload");
                Ok(IngestReceipt {
                    id,
                    location,
                    content_type: normalized.content_type,
                })
            }
            Err(e) => {
                // A failed put may still have left a partial object.
                if let Err(cleanup) = self.store.delete(&id).await {
                    warn!(id = %id, error = %cleanup, "cleanup after failed put also failed");
                }
                Err(UploadError::Store(e))
            }
        }
    }

    /// Delete a stored image and wait until the store stops serving it.
    pub async fn delete(&self, id: &str) -> Result<(), DeleteError> {
        if !self.store.exists(id).await? {
            return Err(DeleteError::Store(StoreError::NotFound(id.to_string())));
        }

        self.store.delete(id).await?;

        let deadline = tokio::time::Instant::now() + DELETE_CONFIRM_WINDOW;
        loop {
            if !self.store.exists(id).await? {
                info!(id = %id, "delete confirmed");
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(DeleteError::ConfirmationTimeout {
                    id: id.to_string(),
                    waited_ms: DELETE_CONFIRM_WINDOW.as_millis() as u64,
                });
            }
            tokio::time::sleep(DELETE_POLL_INTERVAL).await;
        }
    }
}

/// Generate a fresh random identifier: 12 random bytes, hex encoded.
fn random_id() -> String {
    let mut bytes = [0u8; ID_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

// =============================================================================
// Tests
// =============================================================================
