//! Animated GIF processing.
//!
//! Animated sources get a reduced pipeline: every frame goes through the
//! same crop / rotate / resize, but rotation and resize always use
//! nearest-neighbor sampling and the dimension ceiling is lower than the
//! static path. Output is always GIF, preserving frame delays and
//! looping.

use std::io::Cursor;

use image::codecs::gif::{GifDecoder, GifEncoder, Repeat};
use image::{AnimationDecoder, DynamicImage, Frame};

use crate::error::ProcessError;
use crate::transform::{Interpolation, Rotation, TransformRequest};

use super::ops;

/// Dimension ceiling for animated output, per axis.
pub const MAX_ANIMATED_DIMENSION: u32 = 1024;

/// Decode, transform and re-encode an animated GIF.
pub fn process_animated(data: &[u8], request: &TransformRequest) -> Result<Vec<u8>, ProcessError> {
    let decoder =
        GifDecoder::new(Cursor::new(data)).map_err(|e| ProcessError::Decode(e.to_string()))?;
    let frames = decoder
        .into_frames()
        .collect_frames()
        .map_err(|e| ProcessError::Decode(e.to_string()))?;

    if frames.is_empty() {
        return Err(ProcessError::Decode("GIF contains no frames".to_string()));
    }

    let mut out_frames = Vec::with_capacity(frames.len());
    for frame in frames {
        let delay = frame.delay();
        let buffer = transform_frame(frame.into_buffer(), request);
        out_frames.push(Frame::from_parts(buffer, 0, 0, delay));
    }

    let mut encoded = Vec::new();
    {
        let mut encoder = GifEncoder::new(&mut encoded);
        encoder
            .set_repeat(Repeat::Infinite)
            .map_err(|e| ProcessError::Encode(e.to_string()))?;
        encoder
            .encode_frames(out_frames)
            .map_err(|e| ProcessError::Encode(e.to_string()))?;
    }

    Ok(encoded)
}

fn transform_frame(buffer: image::RgbaImage, request: &TransformRequest) -> image::RgbaImage {
    let mut img = DynamicImage::ImageRgba8(buffer);

    if let Some(crop) = &request.crop {
        let (x, y, w, h) = ops::clamp_crop(crop, img.width(), img.height());
        img = img.crop_imm(x, y, w, h);
    }

    if let Some(rotation) = &request.rotate {
        // The animated path forces nearest regardless of the request.
        img = ops::rotate(
            &img,
            Rotation {
                angle: rotation.angle,
                interpolation: Interpolation::Nearest,
            },
        );
    }

    if let Some(resize) = &request.resize {
        let (w, h) =
            ops::resolve_resize_target(img.width(), img.height(), resize, MAX_ANIMATED_DIMENSION);
        if (w, h) != (img.width(), img.height()) {
            img = img.resize_exact(w, h, image::imageops::FilterType::Nearest);
        }
    }

    img.to_rgba8()
}
