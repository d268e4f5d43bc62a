//! Raster operations: crop clamping, rotation, resize geometry, and
//! gamma-aware sample conversion.

use image::{imageops::FilterType, DynamicImage, Rgba, RgbaImage};

use crate::transform::{CropBox, Interpolation, Resampling, Resize, Rotation};

/// Gamma exponent used for linear-light conversion during resize.
const GAMMA: f32 = 2.2;

// =============================================================================
// Crop
// =============================================================================

/// Clamp a crop box to image bounds, returning `(x, y, width, height)`.
///
/// The box is clamped, never rejected: a box entirely outside the image
/// degenerates to a 1x1 region at the nearest edge.
pub fn clamp_crop(crop: &CropBox, width: u32, height: u32) -> (u32, u32, u32, u32) {
    let x0 = crop.x0.min(width.saturating_sub(1));
    let y0 = crop.y0.min(height.saturating_sub(1));
    let x1 = crop.x1.min(width).max(x0 + 1);
    let y1 = crop.y1.min(height).max(y0 + 1);
    (x0, y0, x1 - x0, y1 - y0)
}

// =============================================================================
// Rotation
// =============================================================================

/// Rotate clockwise by the request angle.
///
/// Multiples of 90 degrees are lossless pixel shuffles; any other angle
/// expands the canvas to hold the rotated bounds and fills uncovered
/// corners with transparent black.
pub fn rotate(img: &DynamicImage, rotation: Rotation) -> DynamicImage {
    let angle = rotation.normalized_angle();

    if angle == 0.0 {
        return img.clone();
    }
    if angle == 90.0 {
        return img.rotate90();
    }
    if angle == 180.0 {
        return img.rotate180();
    }
    if angle == 270.0 {
        return img.rotate270();
    }

    let rotated = rotate_arbitrary(&img.to_rgba8(), angle, rotation.interpolation);
    DynamicImage::ImageRgba8(rotated)
}

fn rotate_arbitrary(src: &RgbaImage, angle_deg: f32, interpolation: Interpolation) -> RgbaImage {
    let (w, h) = src.dimensions();
    let theta = angle_deg.to_radians();
    let (sin, cos) = theta.sin_cos();

    // Canvas large enough for the rotated bounding box.
    let out_w = (w as f32 * cos.abs() + h as f32 * sin.abs()).ceil().max(1.0) as u32;
    let out_h = (w as f32 * sin.abs() + h as f32 * cos.abs()).ceil().max(1.0) as u32;

    let cx = w as f32 / 2.0;
    let cy = h as f32 / 2.0;
    let ocx = out_w as f32 / 2.0;
    let ocy = out_h as f32 / 2.0;

    let mut out = RgbaImage::new(out_w, out_h);
    for (x, y, pixel) in out.enumerate_pixels_mut() {
        // Inverse map: output pixel center back into source space.
        let dx = x as f32 + 0.5 - ocx;
        let dy = y as f32 + 0.5 - ocy;
        let sx = dx * cos + dy * sin + cx - 0.5;
        let sy = -dx * sin + dy * cos + cy - 0.5;

        *pixel = match interpolation {
            Interpolation::Nearest => sample_nearest(src, sx, sy),
            Interpolation::Cubic => sample_bicubic(src, sx, sy),
        };
    }
    out
}

fn sample_nearest(src: &RgbaImage, sx: f32, sy: f32) -> Rgba<u8> {
    let x = sx.round();
    let y = sy.round();
    let (w, h) = src.dimensions();
    if x < 0.0 || y < 0.0 || x >= w as f32 || y >= h as f32 {
        Rgba([0, 0, 0, 0])
    } else {
        *src.get_pixel(x as u32, y as u32)
    }
}

/// Catmull-Rom kernel weight for distance `t` in `[-2, 2]`.
fn catmull_rom(t: f32) -> f32 {
    let t = t.abs();
    if t < 1.0 {
        1.5 * t * t * t - 2.5 * t * t + 1.0
    } else if t < 2.0 {
        -0.5 * t * t * t + 2.5 * t * t - 4.0 * t + 2.0
    } else {
        0.0
    }
}

fn sample_bicubic(src: &RgbaImage, sx: f32, sy: f32) -> Rgba<u8> {
    let (w, h) = src.dimensions();
    if sx < -1.0 || sy < -1.0 || sx > w as f32 || sy > h as f32 {
        return Rgba([0, 0, 0, 0]);
    }

    let x0 = sx.floor() as i64;
    let y0 = sy.floor() as i64;
    let fx = sx - x0 as f32;
    let fy = sy - y0 as f32;

    let mut acc = [0.0f32; 4];
    for j in -1..=2i64 {
        let wy = catmull_rom(j as f32 - fy);
        if wy == 0.0 {
            continue;
        }
        let py = y0 + j;
        if py < 0 || py >= h as i64 {
            // Taps outside the image contribute transparent black.
            continue;
        }
        for i in -1..=2i64 {
            let wx = catmull_rom(i as f32 - fx);
            if wx == 0.0 {
                continue;
            }
            let px = x0 + i;
            if px < 0 || px >= w as i64 {
                continue;
            }
            let p = src.get_pixel(px as u32, py as u32);
            let weight = wx * wy;
            for c in 0..4 {
                acc[c] += weight * p.0[c] as f32;
            }
        }
    }

    Rgba([
        acc[0].clamp(0.0, 255.0).round() as u8,
        acc[1].clamp(0.0, 255.0).round() as u8,
        acc[2].clamp(0.0, 255.0).round() as u8,
        acc[3].clamp(0.0, 255.0).round() as u8,
    ])
}

// =============================================================================
// Resize
// =============================================================================

/// Resolve the target dimensions for a resize against a source raster.
///
/// A zero axis is derived from the other axis preserving aspect ratio,
/// then both axes are clamped to `max_dim`.
pub fn resolve_resize_target(
    src_w: u32,
    src_h: u32,
    resize: &Resize,
    max_dim: u32,
) -> (u32, u32) {
    // Clamp the requested axes before deriving, so an extreme request
    // cannot overflow the u32 cast below.
    let mut width = resize.width.min(max_dim);
    let mut height = resize.height.min(max_dim);

    if width == 0 {
        let derived = (src_w as u64 * height as u64) / src_h.max(1) as u64;
        width = derived.clamp(1, max_dim as u64) as u32;
    }
    if height == 0 {
        let derived = (src_h as u64 * width as u64) / src_w.max(1) as u64;
        height = derived.clamp(1, max_dim as u64) as u32;
    }

    (width, height)
}

/// Map a resampling filter to the `image` crate filter.
pub fn filter_for(resampling: Resampling) -> FilterType {
    match resampling {
        Resampling::Nearest => FilterType::Nearest,
        Resampling::Lanczos => FilterType::Lanczos3,
    }
}

/// Resize in linear light: decode gamma into a 16-bit working raster,
/// resize there, then re-encode gamma back to 8-bit.
///
/// Filtering gamma-encoded samples darkens high-contrast detail; the
/// round trip through linear light avoids that at the cost of one
/// conversion each way.
pub fn resize_linear_light(
    img: &DynamicImage,
    width: u32,
    height: u32,
    filter: FilterType,
) -> DynamicImage {
    let rgba = img.to_rgba8();

    let mut to_linear = [0u16; 256];
    for (i, slot) in to_linear.iter_mut().enumerate() {
        *slot = ((i as f32 / 255.0).powf(GAMMA) * 65535.0).round() as u16;
    }

    let (w, h) = rgba.dimensions();
    let mut linear: image::ImageBuffer<Rgba<u16>, Vec<u16>> = image::ImageBuffer::new(w, h);
    for (src, dst) in rgba.pixels().zip(linear.pixels_mut()) {
        // Alpha is coverage, not light: it stays linear in both encodings.
        *dst = Rgba([
            to_linear[src.0[0] as usize],
            to_linear[src.0[1] as usize],
            to_linear[src.0[2] as usize],
            (src.0[3] as u16) * 257,
        ]);
    }

    let resized = DynamicImage::ImageRgba16(linear).resize_exact(width, height, filter);
    let resized = resized.to_rgba16();

    let mut out = RgbaImage::new(width, height);
    for (src, dst) in resized.pixels().zip(out.pixels_mut()) {
        *dst = Rgba([
            from_linear(src.0[0]),
            from_linear(src.0[1]),
            from_linear(src.0[2]),
            (src.0[3] / 257) as u8,
        ]);
    }
    DynamicImage::ImageRgba8(out)
}

fn from_linear(v: u16) -> u8 {
    ((v as f32 / 65535.0).powf(1.0 / GAMMA) * 255.0).round() as u8
}

// =============================================================================
// Tests
// =============================================================================
