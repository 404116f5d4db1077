//! Pure calculation functions for crop geometry.
//!
//! All functions here are pure and testable without any I/O or images.

use super::backend::BackendError;
use super::params::{AspectRatio, CropRegion, CropSelection};

/// Smallest edge, in pixels, a custom crop may have after clamping.
pub const MIN_CROP_EDGE: u32 = 10;

/// Calculate the largest centered crop with the given aspect ratio.
///
/// If the source is wider than the target ratio the full height is kept and
/// the width trimmed; otherwise the full width is kept and the height trimmed.
/// Dimensions and offsets are floored, but each edge keeps at least one
/// pixel of a non-empty source.
///
/// # Examples
/// ```
/// # use vintagecam::imaging::{AspectRatio, CropRegion, calculate_ratio_crop};
/// // 1200x800 landscape to square → 800x800 starting at x=200
/// assert_eq!(
///     calculate_ratio_crop((1200, 800), AspectRatio::Square),
///     CropRegion { x: 200, y: 0, width: 800, height: 800 }
/// );
/// ```
pub fn calculate_ratio_crop(source: (u32, u32), ratio: AspectRatio) -> CropRegion {
    let (src_w, src_h) = source;
    let r = ratio.value();

    let (crop_w, crop_h) = if src_w as f64 / src_h as f64 > r {
        // Source is wider: height is kept
        (src_h as f64 * r, src_h as f64)
    } else {
        // Source is taller (or exact): width is kept
        (src_w as f64, src_w as f64 / r)
    };

    let x = ((src_w as f64 - crop_w) / 2.0).floor() as u32;
    let y = ((src_h as f64 - crop_h) / 2.0).floor() as u32;

    CropRegion {
        x,
        y,
        width: (crop_w.floor() as u32).max(1).min(src_w - x),
        height: (crop_h.floor() as u32).max(1).min(src_h - y),
    }
}

/// Clamp a user-supplied rectangle into the source bounds.
///
/// The origin is clamped to the last valid pixel, then width and height are
/// cut to what remains. Fails with [`BackendError::InvalidCrop`] when either
/// clamped edge is shorter than [`MIN_CROP_EDGE`].
pub fn clamp_custom_crop(
    source: (u32, u32),
    requested: CropRegion,
) -> Result<CropRegion, BackendError> {
    let (src_w, src_h) = source;
    if src_w == 0 || src_h == 0 {
        return Err(BackendError::InvalidCrop {
            width: 0,
            height: 0,
        });
    }

    let x = requested.x.min(src_w - 1);
    let y = requested.y.min(src_h - 1);
    let width = requested.width.min(src_w - x);
    let height = requested.height.min(src_h - y);

    if width < MIN_CROP_EDGE || height < MIN_CROP_EDGE {
        return Err(BackendError::InvalidCrop { width, height });
    }

    Ok(CropRegion {
        x,
        y,
        width,
        height,
    })
}

/// Resolve a crop selection against the source dimensions.
pub fn resolve_crop(
    source: (u32, u32),
    selection: CropSelection,
) -> Result<CropRegion, BackendError> {
    match selection {
        CropSelection::Ratio(_) if source.0 == 0 || source.1 == 0 => {
            Err(BackendError::InvalidCrop {
                width: 0,
                height: 0,
            })
        }
        CropSelection::Ratio(ratio) => Ok(calculate_ratio_crop(source, ratio)),
        CropSelection::Custom(requested) => clamp_custom_crop(source, requested),
    }
}
