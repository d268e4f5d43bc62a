//! Router assembly: routes, CORS, body limits and request tracing.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post};
use axum::Router;
use http::{HeaderValue, Method};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::config::DEFAULT_CACHE_MAX_AGE;
use crate::delivery::ImageService;
use crate::store::BlobStore;

use super::handlers::{
    delete_handler, favicon_handler, health_handler, image_handler, upload_handler, AppState,
};

/// Slack added to the raw body limit on the upload route, covering
/// multipart framing around a payload at the configured maximum.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Router configuration.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Allowed CORS origins; `None` allows any origin.
    pub cors_origins: Option<Vec<String>>,
    /// Cache-Control max-age for delivered variants, in seconds.
    pub cache_max_age: u32,
    /// Whether to attach HTTP request tracing.
    pub enable_tracing: bool,
    /// Maximum upload payload size in bytes.
    pub max_upload_size: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            cors_origins: None,
            cache_max_age: DEFAULT_CACHE_MAX_AGE,
            enable_tracing: false,
            max_upload_size: crate::config::DEFAULT_MAX_UPLOAD_SIZE,
        }
    }
}

/// Build the application router.
///
/// Static routes are registered alongside the `/{source_id}` capture;
/// axum gives them precedence, so `/health`, `/favicon.ico` and
/// `/upload` never reach the store.
pub fn create_router<B: BlobStore>(service: ImageService<B>, config: RouterConfig) -> Router {
    let state = Arc::new(AppState {
        service,
        cache_max_age: config.cache_max_age,
        max_upload_size: config.max_upload_size,
    });

    let mut router = Router::new()
        .route("/health", get(health_handler))
        .route("/favicon.ico", get(favicon_handler))
        .route(
            "/upload",
            post(upload_handler::<B>)
                .layer(DefaultBodyLimit::max(config.max_upload_size + MULTIPART_OVERHEAD)),
        )
        .route("/delete/{id}", delete(delete_handler::<B>))
        .route("/{source_id}", get(image_handler::<B>))
        .with_state(state)
        .layer(cors_layer(config.cors_origins.as_deref()));

    if config.enable_tracing {
        router = router.layer(TraceLayer::new_for_http());
    }

    router
}

fn cors_layer(origins: Option<&[String]>) -> CorsLayer {
    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::OPTIONS,
    ];

    match origins {
        Some(origins) => {
            let parsed: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|origin| match origin.parse() {
                    Ok(value) => Some(value),
                    Err(_) => {
                        warn!(origin = %origin, "ignoring unparsable CORS origin");
                        None
                    }
                })
                .collect();
            CorsLayer::new()
                .allow_origin(parsed)
                .allow_methods(methods)
                .allow_headers(Any)
        }
        None => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any),
    }
}
