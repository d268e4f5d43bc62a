//! The transform request value and its canonical cache key.

use sha2::{Digest, Sha256};

/// Default output quality when the request does not specify one.
pub const DEFAULT_QUALITY: u8 = 80;

// =============================================================================
// Operation Types
// =============================================================================

/// A crop box in source pixel coordinates: `(x0, y0)` inclusive top-left,
/// `(x1, y1)` exclusive bottom-right.
///
/// Boxes are clamped to the image bounds by the pipeline, never rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropBox {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

/// Interpolation mode for rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interpolation {
    Nearest,
    #[default]
    Cubic,
}

impl Interpolation {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "nearest" => Some(Self::Nearest),
            "cubic" => Some(Self::Cubic),
            _ => None,
        }
    }

    const fn tag(self) -> u8 {
        match self {
            Self::Nearest => 0,
            Self::Cubic => 1,
        }
    }
}

/// A rotation by an arbitrary angle in degrees (clockwise).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rotation {
    pub angle: f32,
    pub interpolation: Interpolation,
}

impl Rotation {
    /// Angle normalized to `[0, 360)`.
    ///
    /// Canonicalization and the pipeline both work on the normalized
    /// angle, so `-90` and `270` hash and render identically.
    pub fn normalized_angle(&self) -> f32 {
        self.angle.rem_euclid(360.0)
    }
}

/// Resampling filter for resize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Resampling {
    Nearest,
    #[default]
    Lanczos,
}

impl Resampling {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "nearest" => Some(Self::Nearest),
            "lanczos" => Some(Self::Lanczos),
            _ => None,
        }
    }

    const fn tag(self) -> u8 {
        match self {
            Self::Nearest => 0,
            Self::Lanczos => 1,
        }
    }
}

/// A resize to `width` x `height` pixels.
///
/// A zero in one axis means "preserve aspect ratio, compute from the
/// other axis". Both zero is rejected by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resize {
    pub width: u32,
    pub height: u32,
    pub resampling: Resampling,
}

/// Target encoding format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Jpeg,
    Png,
    Gif,
    WebP,
    Bmp,
    Tiff,
}

impl OutputFormat {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "jpeg" | "jpg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "gif" => Some(Self::Gif),
            "webp" => Some(Self::WebP),
            "bmp" => Some(Self::Bmp),
            "tiff" | "tif" => Some(Self::Tiff),
            _ => None,
        }
    }

    /// MIME content type for this format.
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
            Self::WebP => "image/webp",
            Self::Bmp => "image/bmp",
            Self::Tiff => "image/tiff",
        }
    }

    /// File extension (with leading dot) for this format.
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => ".jpg",
            Self::Png => ".png",
            Self::Gif => ".gif",
            Self::WebP => ".webp",
            Self::Bmp => ".bmp",
            Self::Tiff => ".tiff",
        }
    }

    const fn tag(self) -> u8 {
        match self {
            Self::Jpeg => 0,
            Self::Png => 1,
            Self::Gif => 2,
            Self::WebP => 3,
            Self::Bmp => 4,
            Self::Tiff => 5,
        }
    }
}

// =============================================================================
// Transform Request
// =============================================================================

/// Immutable description of one transform: source identifier plus the
/// requested operations. Unset operations are no-ops.
///
/// The pipeline applies operations in a fixed order (crop, rotate,
/// resize, gamma, encode) regardless of the order parameters appeared in
/// the query string; [`TransformRequest::canonical_bytes`] serializes in
/// that same fixed order so equivalent requests share a cache key.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformRequest {
    pub source_id: String,
    pub crop: Option<CropBox>,
    pub rotate: Option<Rotation>,
    pub resize: Option<Resize>,
    pub format: Option<OutputFormat>,
    pub quality: u8,
    pub gamma_correction: bool,
}

impl TransformRequest {
    /// Create a request with no operations (pass-through re-encode).
    pub fn new(source_id: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            crop: None,
            rotate: None,
            resize: None,
            format: None,
            quality: DEFAULT_QUALITY,
            gamma_correction: false,
        }
    }

    /// Stable byte representation used for cache-key hashing.
    ///
    /// Fields are written in fixed order with one tag byte per present
    /// operation and little-endian values. The rotation angle contributes
    /// the bit pattern of its normalized value, so canonical forms are
    /// bitwise stable.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(64 + self.source_id.len());

        buf.extend_from_slice(&(self.source_id.len() as u32).to_le_bytes());
        buf.extend_from_slice(self.source_id.as_bytes());

        match self.crop {
            Some(c) => {
                buf.push(1);
                buf.extend_from_slice(&c.x0.to_le_bytes());
                buf.extend_from_slice(&c.y0.to_le_bytes());
                buf.extend_from_slice(&c.x1.to_le_bytes());
                buf.extend_from_slice(&c.y1.to_le_bytes());
            }
            None => buf.push(0),
        }

        match self.rotate {
            Some(r) => {
                buf.push(1);
                buf.extend_from_slice(&r.normalized_angle().to_bits().to_le_bytes());
                buf.push(r.interpolation.tag());
            }
            None => buf.push(0),
        }

        match self.resize {
            Some(r) => {
                buf.push(1);
                buf.extend_from_slice(&r.width.to_le_bytes());
                buf.extend_from_slice(&r.height.to_le_bytes());
                buf.push(r.resampling.tag());
            }
            None => buf.push(0),
        }

        match self.format {
            Some(f) => {
                buf.push(1);
                buf.push(f.tag());
            }
            None => buf.push(0),
        }

        buf.push(self.quality);
        buf.push(self.gamma_correction as u8);

        buf
    }

    /// Compute the cache key: SHA-256 over the canonical bytes.
    pub fn cache_key(&self) -> CacheKey {
        let digest = Sha256::digest(self.canonical_bytes());
        CacheKey(digest.into())
    }
}

// =============================================================================
// Cache Key
// =============================================================================

/// Fixed-width digest identifying one transform request.
///
/// Identical canonical forms always produce the same key; distinct forms
/// collide only with cryptographic-hash probability.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey([u8; 32]);

impl CacheKey {
    /// Full hex encoding of the digest.
    pub fn hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Quoted ETag value derived from the key, suitable for the `ETag`
    /// header and `If-None-Match` comparison.
    pub fn etag(&self) -> String {
        format!("\"{}\"", &self.hex()[..32])
    }
}

// =============================================================================
// Tests
// =============================================================================
