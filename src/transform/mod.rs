//! Transform request model and request-parameter parsing.
//!
//! A [`TransformRequest`] is the structured description of one delivery
//! request: the source identifier plus the optional crop / rotate /
//! resize / format / quality / gamma operations. It canonicalizes to a
//! stable byte form, and its SHA-256 digest is the [`CacheKey`] used by
//! the result cache and for ETags.

mod params;
mod request;

pub use params::parse_transform;
pub use request::{
    CacheKey, CropBox, Interpolation, OutputFormat, Resampling, Resize, Rotation,
    TransformRequest, DEFAULT_QUALITY,
};
