//! Procedural grain and vignette.
//!
//! Both effects are cosmetic: [`add_grain`] and [`add_vignette`] never fail.
//! If the mask cannot be built (empty image, out-of-range settings) the input
//! comes back unmodified and a warning is logged. The fallible cores are
//! exposed as [`try_grain`] and [`try_vignette`].

use super::params::{Grain, Vignette};
use image::RgbImage;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use thiserror::Error;
use tracing::warn;

const MID_GRAY: f32 = 128.0;

#[derive(Error, Debug)]
pub enum EffectError {
    #[error("image has no pixels")]
    EmptyImage,
    #[error("intensity {0} out of range")]
    Intensity(f32),
    #[error("radius {0} out of range")]
    Radius(f32),
    #[error("noise distribution: {0}")]
    Distribution(String),
}

/// Overlay blend of two 0–255 values: darkens darks, lightens lights.
fn overlay(base: f32, blend: f32) -> f32 {
    let a = base / 255.0;
    let b = blend / 255.0;
    let v = if a < 0.5 {
        2.0 * a * b
    } else {
        1.0 - 2.0 * (1.0 - a) * (1.0 - b)
    };
    v * 255.0
}

/// Overlay a mid-gray Gaussian noise field onto the image.
pub fn try_grain<R: Rng + ?Sized>(
    img: &RgbImage,
    grain: &Grain,
    rng: &mut R,
) -> Result<RgbImage, EffectError> {
    if img.width() == 0 || img.height() == 0 {
        return Err(EffectError::EmptyImage);
    }
    if !(grain.intensity > 0.0 && grain.intensity <= 1.0) {
        return Err(EffectError::Intensity(grain.intensity));
    }
    let noise = Normal::new(MID_GRAY, grain.size.sigma())
        .map_err(|e| EffectError::Distribution(e.to_string()))?;

    let offset = MID_GRAY * (1.0 - grain.intensity);
    let mut out = img.clone();
    for px in out.pixels_mut() {
        let sample: f32 = noise.sample(rng);
        let blend = sample.clamp(0.0, 255.0) * grain.intensity + offset;
        for c in px.0.iter_mut() {
            *c = overlay(*c as f32, blend).round().clamp(0.0, 255.0) as u8;
        }
    }
    Ok(out)
}

/// Best-effort grain. Returns a copy of the input when grain cannot be applied.
pub fn add_grain<R: Rng + ?Sized>(img: &RgbImage, grain: &Grain, rng: &mut R) -> RgbImage {
    match try_grain(img, grain, rng) {
        Ok(out) => out,
        Err(e) => {
            warn!(error = %e, "grain skipped");
            img.clone()
        }
    }
}

/// Multiply the image by a radial mask that falls off from the center.
pub fn try_vignette(img: &RgbImage, vignette: &Vignette) -> Result<RgbImage, EffectError> {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return Err(EffectError::EmptyImage);
    }
    if !(0.0..=1.0).contains(&vignette.intensity) {
        return Err(EffectError::Intensity(vignette.intensity));
    }
    if !(vignette.radius > 0.0 && vignette.radius <= 1.0) {
        return Err(EffectError::Radius(vignette.radius));
    }

    let cx = w as f32 / 2.0;
    let cy = h as f32 / 2.0;
    let max_r = (cx * cx + cy * cy).sqrt() * vignette.radius;

    let mut out = img.clone();
    for (x, y, px) in out.enumerate_pixels_mut() {
        let dx = x as f32 - cx;
        let dy = y as f32 - cy;
        let d = (dx * dx + dy * dy).sqrt();
        let factor = (1.0 - d / max_r * vignette.intensity).max(0.0);
        let mask = (255.0 * factor).floor();
        for c in px.0.iter_mut() {
            *c = (*c as f32 * mask / 255.0).round() as u8;
        }
    }
    Ok(out)
}

/// Best-effort vignette. Returns a copy of the input when it cannot be applied.
pub fn add_vignette(img: &RgbImage, vignette: &Vignette) -> RgbImage {
    match try_vignette(img, vignette) {
        Ok(out) => out,
        Err(e) => {
            warn!(error = %e, "vignette skipped");
            img.clone()
        }
    }
}
