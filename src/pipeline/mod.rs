//! Image processing pipeline.
//!
//! Turns stored source bytes plus a [`TransformRequest`] into encoded
//! output bytes. The pipeline is synchronous CPU work; callers run it
//! under the delivery concurrency limiter.
//!
//! [`TransformRequest`]: crate::transform::TransformRequest

mod animated;
mod format;
mod ops;
mod processor;

pub use animated::MAX_ANIMATED_DIMENSION;
pub use format::ImageKind;
pub use processor::{ImageProcessor, ProcessedImage, MAX_STATIC_DIMENSION};
