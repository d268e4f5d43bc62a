//! Delivery layer: caching, concurrency control and the core service.
//!
//! [`ImageService`] is the seam between the HTTP surface and everything
//! below it. It owns the result cache (with single-flight computation
//! sharing), the pipeline concurrency limiter, and the ingest/delete
//! flows against the blob store.

mod cache;
mod limiter;
mod service;

pub use cache::ResultCache;
pub use limiter::ConcurrencyLimiter;
pub use service::{DeliveredImage, ImageService, IngestReceipt};
