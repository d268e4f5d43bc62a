//! The transform pipeline: decode, operate, encode.

use std::io::Cursor;

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat};
use tracing::warn;

use crate::error::ProcessError;
use crate::transform::{OutputFormat, Resampling, Resize, TransformRequest};

use super::animated;
use super::format::ImageKind;
use super::ops;

/// Dimension ceiling for static output, per axis.
pub const MAX_STATIC_DIMENSION: u32 = 2048;

/// Target height for upload normalization.
const NORMALIZE_HEIGHT: u32 = 800;

/// JPEG quality for upload normalization.
const NORMALIZE_QUALITY: u8 = 80;

/// A fully processed, encoded image ready for delivery or storage.
#[derive(Debug, Clone)]
pub struct ProcessedImage {
    pub data: Bytes,
    pub content_type: &'static str,
}

impl ProcessedImage {
    /// Size of the encoded payload in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Applies transform requests to source bytes.
///
/// The processor is stateless and cheap to share; all per-request state
/// lives in the [`TransformRequest`].
#[derive(Debug, Default)]
pub struct ImageProcessor;

impl ImageProcessor {
    pub fn new() -> Self {
        Self
    }

    /// Run the full pipeline for a delivery request.
    ///
    /// Operations apply in fixed order: crop, rotate, resize, encode.
    /// Animated GIF sources keep their animation when the output format
    /// stays GIF; if the animated path fails the source is retried as a
    /// static image, which keeps only the first frame.
    pub fn process(
        &self,
        data: &[u8],
        request: &TransformRequest,
    ) -> Result<ProcessedImage, ProcessError> {
        let kind = ImageKind::sniff(data)?;

        let wants_gif = matches!(request.format, None | Some(OutputFormat::Gif));
        if kind == ImageKind::Gif && wants_gif {
            match animated::process_animated(data, request) {
                Ok(encoded) => {
                    return Ok(ProcessedImage {
                        data: Bytes::from(encoded),
                        content_type: OutputFormat::Gif.content_type(),
                    });
                }
                Err(e) => {
                    warn!(source_id = %request.source_id, error = %e,
                        "animated processing failed, retrying as static image");
                }
            }
        }

        let img = image::load_from_memory_with_format(data, kind.decode_format())
            .map_err(|e| ProcessError::Decode(e.to_string()))?;

        let img = self.apply_static_ops(img, request);

        let output = request.format.unwrap_or_else(|| kind.output_format());
        self.encode(&img, output, request.quality)
    }

    fn apply_static_ops(&self, mut img: DynamicImage, request: &TransformRequest) -> DynamicImage {
        if let Some(crop) = &request.crop {
            let (x, y, w, h) = ops::clamp_crop(crop, img.width(), img.height());
            img = img.crop_imm(x, y, w, h);
        }

        if let Some(rotation) = &request.rotate {
            img = ops::rotate(&img, *rotation);
        }

        if let Some(resize) = &request.resize {
            let (w, h) =
                ops::resolve_resize_target(img.width(), img.height(), resize, MAX_STATIC_DIMENSION);
            if (w, h) != (img.width(), img.height()) {
                let filter = ops::filter_for(resize.resampling);
                img = if request.gamma_correction {
                    ops::resize_linear_light(&img, w, h, filter)
                } else {
                    img.resize_exact(w, h, filter)
                };
            }
        }

        img
    }

    fn encode(
        &self,
        img: &DynamicImage,
        output: OutputFormat,
        quality: u8,
    ) -> Result<ProcessedImage, ProcessError> {
        let mut buf = Cursor::new(Vec::new());

        match output {
            OutputFormat::Jpeg => {
                // JPEG has no alpha channel.
                let rgb = img.to_rgb8();
                let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality);
                encoder
                    .encode_image(&rgb)
                    .map_err(|e| ProcessError::Encode(e.to_string()))?;
            }
            OutputFormat::Png => self.write_as(img, &mut buf, ImageFormat::Png)?,
            // The GIF and WebP encoders only take 8-bit RGB(A) buffers.
            OutputFormat::Gif => {
                let rgba = DynamicImage::ImageRgba8(img.to_rgba8());
                self.write_as(&rgba, &mut buf, ImageFormat::Gif)?
            }
            OutputFormat::WebP => {
                let rgba = DynamicImage::ImageRgba8(img.to_rgba8());
                self.write_as(&rgba, &mut buf, ImageFormat::WebP)?
            }
            OutputFormat::Bmp => self.write_as(img, &mut buf, ImageFormat::Bmp)?,
            OutputFormat::Tiff => self.write_as(img, &mut buf, ImageFormat::Tiff)?,
        }

        Ok(ProcessedImage {
            data: Bytes::from(buf.into_inner()),
            content_type: output.content_type(),
        })
    }

    fn write_as(
        &self,
        img: &DynamicImage,
        buf: &mut Cursor<Vec<u8>>,
        format: ImageFormat,
    ) -> Result<(), ProcessError> {
        img.write_to(buf, format)
            .map_err(|e| ProcessError::Encode(e.to_string()))
    }

    /// Normalize an uploaded image for storage.
    ///
    /// Every accepted upload is stored the same way: resized to 800px
    /// tall (aspect preserved), lightly sharpened to compensate for the
    /// resampling, and encoded as JPEG at quality 80.
    pub fn normalize(&self, data: &[u8]) -> Result<ProcessedImage, ProcessError> {
        let kind = ImageKind::sniff(data)?;
        let img = image::load_from_memory_with_format(data, kind.decode_format())
            .map_err(|e| ProcessError::Decode(e.to_string()))?;

        let resize = Resize {
            width: 0,
            height: NORMALIZE_HEIGHT,
            resampling: Resampling::Lanczos,
        };
        let (w, h) =
            ops::resolve_resize_target(img.width(), img.height(), &resize, MAX_STATIC_DIMENSION);
        let img = img
            .resize_exact(w, h, image::imageops::FilterType::Lanczos3)
            .unsharpen(1.0, 0);

        self.encode(&img, OutputFormat::Jpeg, NORMALIZE_QUALITY)
    }
}

// =============================================================================
// Tests
// =============================================================================
