//! HTTP surface: handlers, error mapping and router assembly.

mod handlers;
mod routes;

pub use handlers::{AppState, ErrorResponse, UploadResponse, CACHE_HIT_HEADER};
pub use routes::{create_router, RouterConfig};
