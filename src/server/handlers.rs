//! HTTP request handlers and error -> response mapping.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::{header, HeaderMap, HeaderName, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, error, info, warn};

use crate::delivery::ImageService;
use crate::error::{DeleteError, DeliverError, ParamError, ProcessError, StoreError, UploadError};
use crate::store::BlobStore;
use crate::transform::parse_transform;

/// Header reporting whether the variant came from the result cache.
pub const CACHE_HIT_HEADER: &str = "x-cache-hit";

/// Multipart field name carrying the uploaded file.
const UPLOAD_FIELD: &str = "uploadFile";

/// Shared application state for all handlers.
pub struct AppState<B> {
    pub service: ImageService<B>,
    pub cache_max_age: u32,
    pub max_upload_size: usize,
}

impl<B> AppState<B> {
    fn cache_control(&self) -> String {
        format!("public, max-age={}", self.cache_max_age)
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// GET /{source_id} - deliver a transformed variant.
pub async fn image_handler<B: BlobStore>(
    State(state): State<Arc<AppState<B>>>,
    Path(source_id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let request = match parse_transform(&source_id, &params) {
        Ok(request) => request,
        Err(e) => return e.into_response(),
    };

    // Conditional requests short-circuit before any fetch or compute:
    // the ETag is a pure function of the request.
    let etag = state.service.etag_for(&request);
    if if_none_match_matches(&headers, &etag) {
        return (
            StatusCode::NOT_MODIFIED,
            [
                (header::ETAG, etag),
                (header::CACHE_CONTROL, state.cache_control()),
            ],
        )
            .into_response();
    }

    match state.service.deliver(request).await {
        Ok(delivered) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, delivered.content_type.to_string()),
                (header::CACHE_CONTROL, state.cache_control()),
                (header::ETAG, delivered.etag),
                (
                    HeaderName::from_static(CACHE_HIT_HEADER),
                    delivered.cache_hit.to_string(),
                ),
            ],
            delivered.data,
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

fn if_none_match_matches(headers: &HeaderMap, etag: &str) -> bool {
    let Some(value) = headers.get(header::IF_NONE_MATCH) else {
        return false;
    };
    let Ok(value) = value.to_str() else {
        return false;
    };
    value
        .split(',')
        .any(|candidate| candidate.trim() == etag || candidate.trim() == "*")
}

/// Response body for a successful upload.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub id: String,
    pub location: String,
    pub content_type: String,
}

/// POST /upload - ingest a multipart image upload.
pub async fn upload_handler<B: BlobStore>(
    State(state): State<Arc<AppState<B>>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    let mut payload: Option<Bytes> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return multipart_error(e, &headers, state.max_upload_size).into_response(),
        };

        match field.name() {
            Some(UPLOAD_FIELD) => match field.bytes().await {
                Ok(bytes) => payload = Some(bytes),
                Err(e) => {
                    return multipart_error(e, &headers, state.max_upload_size).into_response()
                }
            },
            // Other fields (such as the legacy "type" hint) are logged
            // and discarded; the stored format is decided by
            // normalization.
            _ => {
                let name = field.name().unwrap_or("").to_string();
                if let Ok(value) = field.text().await {
                    debug!(field = %name, value = %value, "ignoring extra upload field");
                }
            }
        }
    }

    let Some(payload) = payload else {
        return UploadError::InvalidUpload(format!("missing {UPLOAD_FIELD} field")).into_response();
    };

    match state.service.ingest(payload).await {
        Ok(receipt) => {
            let body = UploadResponse {
                id: receipt.id,
                location: receipt.location,
                content_type: receipt.content_type.to_string(),
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// Map a multipart read failure to an upload error.
///
/// A body that blows through the route's body limit fails inside the
/// multipart read, before the payload ever reaches the ingest size
/// check, so the length-limit case is detected here and reported as
/// 413 like any other oversize upload. The advertised size falls back
/// to the Content-Length header when the read never completed.
fn multipart_error(error: MultipartError, headers: &HeaderMap, max: usize) -> UploadError {
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        let size = headers
            .get(header::CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse().ok())
            .unwrap_or(max + 1);
        return UploadError::PayloadTooLarge { size, max };
    }
    UploadError::InvalidUpload(format!("malformed multipart body: {error}"))
}

/// DELETE /delete/{id} - remove a stored image.
pub async fn delete_handler<B: BlobStore>(
    State(state): State<Arc<AppState<B>>>,
    Path(id): Path<String>,
) -> Response {
    match state.service.delete(&id).await {
        Ok(()) => {
            info!(id = %id, "deleted stored image");
            (StatusCode::OK, Json(json!({ "id": id, "deleted": true }))).into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// GET /health - liveness probe.
pub async fn health_handler() -> Response {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION"),
        })),
    )
        .into_response()
}

/// GET /favicon.ico - always 404, kept off the source-id route so
/// browser requests never hit the store.
pub async fn favicon_handler() -> Response {
    StatusCode::NOT_FOUND.into_response()
}

// =============================================================================
// Error Responses
// =============================================================================

/// JSON error body returned for every failure.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status: u16,
}

fn error_response(status: StatusCode, error: &str, message: String) -> Response {
    let body = ErrorResponse {
        error: error.to_string(),
        message,
        status: status.as_u16(),
    };
    (status, Json(body)).into_response()
}

impl IntoResponse for ParamError {
    fn into_response(self) -> Response {
        warn!(error = %self, "rejected request parameters");
        error_response(StatusCode::BAD_REQUEST, "invalid_request", self.to_string())
    }
}

impl IntoResponse for StoreError {
    fn into_response(self) -> Response {
        match &self {
            StoreError::NotFound(_) => {
                warn!(error = %self, "object not found");
                error_response(StatusCode::NOT_FOUND, "not_found", self.to_string())
            }
            StoreError::S3(_) => {
                error!(error = %self, "store failure");
                error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "store_error",
                    self.to_string(),
                )
            }
            StoreError::Connection(_) => {
                error!(error = %self, "store unreachable");
                error_response(StatusCode::BAD_GATEWAY, "store_unreachable", self.to_string())
            }
        }
    }
}

impl IntoResponse for ProcessError {
    fn into_response(self) -> Response {
        match &self {
            ProcessError::UnsupportedFormat { .. } => {
                warn!(error = %self, "unsupported source format");
                error_response(
                    StatusCode::UNSUPPORTED_MEDIA_TYPE,
                    "unsupported_format",
                    self.to_string(),
                )
            }
            ProcessError::Decode(_) | ProcessError::Encode(_) => {
                error!(error = %self, "pipeline failure");
                error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "processing_error",
                    self.to_string(),
                )
            }
        }
    }
}

impl IntoResponse for DeliverError {
    fn into_response(self) -> Response {
        match self {
            DeliverError::Param(e) => e.into_response(),
            DeliverError::Store(e) => e.into_response(),
            DeliverError::Process(e) => e.into_response(),
        }
    }
}

impl IntoResponse for UploadError {
    fn into_response(self) -> Response {
        match self {
            UploadError::PayloadTooLarge { .. } => {
                warn!(error = %self, "upload rejected");
                error_response(
                    StatusCode::PAYLOAD_TOO_LARGE,
                    "payload_too_large",
                    self.to_string(),
                )
            }
            UploadError::UnsupportedFormat { .. } => {
                warn!(error = %self, "upload rejected");
                error_response(
                    StatusCode::BAD_REQUEST,
                    "unsupported_upload",
                    self.to_string(),
                )
            }
            UploadError::InvalidUpload(_) => {
                warn!(error = %self, "upload rejected");
                error_response(StatusCode::BAD_REQUEST, "invalid_upload", self.to_string())
            }
            UploadError::Process(e) => {
                error!(error = %e, "upload normalization failed");
                error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "processing_error",
                    e.to_string(),
                )
            }
            UploadError::Store(e) => {
                error!(error = %e, "upload storage failed");
                error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "store_error",
                    e.to_string(),
                )
            }
        }
    }
}

impl IntoResponse for DeleteError {
    fn into_response(self) -> Response {
        match self {
            DeleteError::Store(e) => e.into_response(),
            DeleteError::ConfirmationTimeout { .. } => {
                error!(error = %self, "delete not confirmed");
                error_response(
                    StatusCode::GATEWAY_TIMEOUT,
                    "delete_unconfirmed",
                    self.to_string(),
                )
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
