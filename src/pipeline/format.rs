//! Input format detection from magic bytes.
//!
//! Content sniffing is done on the stored bytes, never on file
//! extensions or client-supplied content types: the object key carries
//! no trustworthy format information.

use image::ImageFormat;

use crate::error::ProcessError;
use crate::transform::OutputFormat;

/// An input format the pipeline can decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
    Gif,
    WebP,
    Bmp,
    Tiff,
}

impl ImageKind {
    /// Detect the format from the leading bytes of a blob.
    pub fn sniff(data: &[u8]) -> Result<Self, ProcessError> {
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Ok(Self::Jpeg);
        }
        if data.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Ok(Self::Png);
        }
        if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
            return Ok(Self::Gif);
        }
        if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
            return Ok(Self::WebP);
        }
        if data.starts_with(b"BM") {
            return Ok(Self::Bmp);
        }
        if data.starts_with(&[0x49, 0x49, 0x2A, 0x00]) || data.starts_with(&[0x4D, 0x4D, 0x00, 0x2A])
        {
            return Ok(Self::Tiff);
        }

        Err(ProcessError::UnsupportedFormat {
            reason: "byte signature matches no supported image format".to_string(),
        })
    }

    /// The decoder format for the `image` crate.
    pub const fn decode_format(self) -> ImageFormat {
        match self {
            Self::Jpeg => ImageFormat::Jpeg,
            Self::Png => ImageFormat::Png,
            Self::Gif => ImageFormat::Gif,
            Self::WebP => ImageFormat::WebP,
            Self::Bmp => ImageFormat::Bmp,
            Self::Tiff => ImageFormat::Tiff,
        }
    }

    /// The output format matching this input, used when a request does
    /// not override the format.
    pub const fn output_format(self) -> OutputFormat {
        match self {
            Self::Jpeg => OutputFormat::Jpeg,
            Self::Png => OutputFormat::Png,
            Self::Gif => OutputFormat::Gif,
            Self::WebP => OutputFormat::WebP,
            Self::Bmp => OutputFormat::Bmp,
            Self::Tiff => OutputFormat::Tiff,
        }
    }
}
