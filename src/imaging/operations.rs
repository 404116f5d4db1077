//! High-level image operations.
//!
//! These functions combine calculations with backend execution. They take
//! the user's options, resolve them against the actual source into a
//! [`RenderParams`], and hand that to the backend.

use super::backend::{BackendError, ImageBackend};
use super::calculations::resolve_crop;
use super::params::{ProcessOptions, RenderParams, RenderSettings};
use std::path::Path;
use tracing::{debug, info};

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Get image dimensions using the backend.
pub fn get_dimensions(backend: &impl ImageBackend, path: &Path) -> Result<(u32, u32)> {
    let dims = backend.identify(path)?;
    Ok((dims.width, dims.height))
}

/// Resolve options against known source dimensions. Pure; touches no files.
pub fn plan_render(
    source: &Path,
    output: &Path,
    source_dims: (u32, u32),
    options: &ProcessOptions,
    settings: &RenderSettings,
) -> Result<RenderParams> {
    let crop = resolve_crop(source_dims, options.crop_selection())?;
    Ok(RenderParams {
        source: source.to_path_buf(),
        output: output.to_path_buf(),
        crop,
        stock: options.film_stock,
        grain: options.grain(),
        vignette: options.vignette(settings.vignette_radius),
        quality: settings.quality,
        seed: settings.seed,
    })
}

/// Process one image from `source` into `output`.
///
/// Sequence: check the source exists, identify it, plan the crop, render.
/// Any failure leaves `output` untouched.
pub fn process_image(
    backend: &impl ImageBackend,
    source: &Path,
    output: &Path,
    options: &ProcessOptions,
    settings: &RenderSettings,
) -> Result<RenderParams> {
    if !source.exists() {
        return Err(BackendError::SourceNotFound(source.to_path_buf()));
    }
    let dims = get_dimensions(backend, source)?;
    let params = plan_render(source, output, dims, options, settings)?;

    debug!(
        source = %source.display(),
        width = dims.0,
        height = dims.1,
        crop = ?params.crop,
        "planned render"
    );
    info!(
        film_stock = %params.stock,
        grain = params.grain.is_some(),
        vignette = params.vignette.is_some(),
        "processing image"
    );

    backend.render(&params)?;
    Ok(params)
}
