//! Query-parameter parsing into a [`TransformRequest`].
//!
//! Parsing is strict on values and permissive on vocabulary: a parameter
//! we recognize must parse and pass its range check, while parameters we
//! do not recognize are ignored so clients can carry extra keys without
//! breaking delivery.

use std::collections::HashMap;

use crate::error::ParamError;

use super::request::{
    CropBox, Interpolation, OutputFormat, Resampling, Resize, Rotation, TransformRequest,
};

/// Parse the query parameters of a delivery request.
///
/// `source_id` is the path segment identifying the original image; the
/// map holds the raw query string key/value pairs.
pub fn parse_transform(
    source_id: &str,
    params: &HashMap<String, String>,
) -> Result<TransformRequest, ParamError> {
    if source_id.is_empty() {
        return Err(ParamError::MissingSource);
    }

    let mut request = TransformRequest::new(source_id);

    if let Some(raw) = params.get("crop") {
        request.crop = Some(parse_crop(raw)?);
    }

    if let Some(raw) = params.get("rotation") {
        let angle: f32 = raw.parse().map_err(|_| ParamError::InvalidParameter {
            name: "rotation",
            message: format!("not a number: {raw:?}"),
        })?;
        if !angle.is_finite() {
            return Err(ParamError::InvalidParameter {
                name: "rotation",
                message: "angle must be finite".to_string(),
            });
        }

        let interpolation = match params.get("interpolation") {
            Some(token) => {
                Interpolation::from_token(token).ok_or(ParamError::InvalidParameter {
                    name: "interpolation",
                    message: format!("unknown mode {token:?}, expected nearest or cubic"),
                })?
            }
            None => Interpolation::default(),
        };

        request.rotate = Some(Rotation {
            angle,
            interpolation,
        });
    }

    let width = parse_dimension(params, "width")?;
    let height = parse_dimension(params, "height")?;
    if width.is_some() || height.is_some() {
        let width = width.unwrap_or(0);
        let height = height.unwrap_or(0);
        if width == 0 && height == 0 {
            return Err(ParamError::InvalidParameter {
                name: "width",
                message: "width and height cannot both be zero".to_string(),
            });
        }

        let resampling = match params.get("resampling") {
            Some(token) => Resampling::from_token(token).ok_or(ParamError::InvalidParameter {
                name: "resampling",
                message: format!("unknown filter {token:?}, expected nearest or lanczos"),
            })?,
            None => Resampling::default(),
        };

        request.resize = Some(Resize {
            width,
            height,
            resampling,
        });
    }

    if let Some(token) = params.get("format") {
        request.format = Some(OutputFormat::from_token(token).ok_or(
            ParamError::InvalidParameter {
                name: "format",
                message: format!("unsupported format {token:?}"),
            },
        )?);
    }

    if let Some(raw) = params.get("quality") {
        let quality: u8 = raw.parse().map_err(|_| ParamError::InvalidParameter {
            name: "quality",
            message: format!("not an integer: {raw:?}"),
        })?;
        if !(1..=100).contains(&quality) {
            return Err(ParamError::InvalidParameter {
                name: "quality",
                message: format!("{quality} out of range 1..=100"),
            });
        }
        request.quality = quality;
    }

    if let Some(raw) = params.get("gamma") {
        request.gamma_correction = parse_bool(raw).ok_or(ParamError::InvalidParameter {
            name: "gamma",
            message: format!("not a boolean: {raw:?}"),
        })?;
    }

    Ok(request)
}

/// Parse a `crop=x0,y0,x1,y1` value.
fn parse_crop(raw: &str) -> Result<CropBox, ParamError> {
    let invalid = |message: String| ParamError::InvalidParameter {
        name: "crop",
        message,
    };

    let parts: Vec<&str> = raw.split(',').collect();
    if parts.len() != 4 {
        return Err(invalid(format!(
            "expected x0,y0,x1,y1 but got {} value(s)",
            parts.len()
        )));
    }

    let mut coords = [0u32; 4];
    for (slot, part) in coords.iter_mut().zip(&parts) {
        *slot = part
            .trim()
            .parse()
            .map_err(|_| invalid(format!("not an integer: {part:?}")))?;
    }

    let [x0, y0, x1, y1] = coords;
    if x1 <= x0 || y1 <= y0 {
        return Err(invalid(format!(
            "empty box: ({x0},{y0})..({x1},{y1}) has no area"
        )));
    }

    Ok(CropBox { x0, y0, x1, y1 })
}

fn parse_dimension(
    params: &HashMap<String, String>,
    name: &'static str,
) -> Result<Option<u32>, ParamError> {
    match params.get(name) {
        Some(raw) => {
            let value: u32 = raw.parse().map_err(|_| ParamError::InvalidParameter {
                name,
                message: format!("not an integer: {raw:?}"),
            })?;
            Ok(Some(value))
        }
        None => Ok(None),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

// =============================================================================
// Tests
// =============================================================================
