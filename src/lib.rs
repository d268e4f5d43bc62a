//! imagepress - an on-demand image transform and delivery server.
//!
//! Originals live in S3 (or any S3-compatible store). Clients request
//! transformed variants by query parameters (crop, rotate, resize,
//! format, quality, gamma); results are computed once per unique
//! request, cached in memory under a byte budget, and served with
//! long-lived HTTP caching headers. Uploads are normalized and stored
//! back into the same bucket, and stored images can be deleted with
//! confirmation.
//!
//! # Architecture
//!
//! - [`transform`] - request model, parameter parsing, cache keys
//! - [`pipeline`] - decode / crop / rotate / resize / encode
//! - [`store`] - the [`BlobStore`](store::BlobStore) seam over S3
//! - [`delivery`] - result cache, single-flight, concurrency limiter,
//!   and the [`ImageService`](delivery::ImageService) operations
//! - [`server`] - axum handlers, error mapping, router
//! - [`config`] - CLI and environment configuration

pub mod config;
pub mod delivery;
pub mod error;
pub mod pipeline;
pub mod server;
pub mod store;
pub mod transform;

pub use config::Config;
pub use delivery::{ConcurrencyLimiter, ImageService, ResultCache};
pub use error::{DeleteError, DeliverError, ParamError, ProcessError, StoreError, UploadError};
pub use pipeline::ImageProcessor;
pub use server::{create_router, RouterConfig};
pub use store::{BlobStore, S3BlobStore};
pub use transform::TransformRequest;
