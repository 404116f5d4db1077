//! Film-look color pipeline.
//!
//! [`apply_profile`] runs a fixed sequence of stages over an RGB8 image:
//!
//! 1. **Modulate**: lightness × brightness, saturation × saturation, hue + degrees (HSL)
//! 2. **Gamma**: `out = 255 · (in/255)^(1/gamma)`
//! 3. **Warmth**: per-channel multiply (optional)
//! 4. **Channel mix**: 3×3 matrix recombination (optional)
//! 5. **Contrast**: luma percentile window stretched to 0–255
//! 6. **Sharpen**: unsharp mask with separate flat/jagged gains (optional)
//! 7. **Soften**: Gaussian blur (optional)
//!
//! Every stage is total: any 8-bit input produces an 8-bit output, nothing
//! here can fail. Stages are pure functions of their input, so the same image
//! and profile always produce identical bytes.

use super::profiles::{ContrastWindow, FilmStockProfile, UnsharpMask};
use image::{RgbImage, imageops};

/// Local differences at or below this (0–255 scale) count as "flat" when sharpening.
pub const FLAT_THRESHOLD: f32 = 2.0;

/// HSL color. Hue in degrees (0–360), saturation and lightness in 0–1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsl {
    pub h: f32,
    pub s: f32,
    pub l: f32,
}

/// Convert RGB (each 0.0–1.0) to HSL.
pub fn rgb_to_hsl(r: f32, g: f32, b: f32) -> Hsl {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;
    let l = (max + min) / 2.0;

    if delta < 1e-6 {
        return Hsl { h: 0.0, s: 0.0, l };
    }

    let s = if l < 0.5 {
        delta / (max + min)
    } else {
        delta / (2.0 - max - min)
    };

    let h = if max == r {
        let h = (g - b) / delta;
        if h < 0.0 { h + 6.0 } else { h }
    } else if max == g {
        (b - r) / delta + 2.0
    } else {
        (r - g) / delta + 4.0
    };

    Hsl {
        h: (h * 60.0) % 360.0,
        s,
        l,
    }
}

/// Convert HSL back to RGB (each 0.0–1.0). Out-of-range inputs are clamped.
pub fn hsl_to_rgb(hsl: Hsl) -> (f32, f32, f32) {
    let s = hsl.s.clamp(0.0, 1.0);
    let l = hsl.l.clamp(0.0, 1.0);

    if s < 1e-6 {
        return (l, l, l);
    }

    let h = hsl.h.rem_euclid(360.0) / 360.0;
    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;

    (
        hue_to_channel(p, q, h + 1.0 / 3.0),
        hue_to_channel(p, q, h),
        hue_to_channel(p, q, h - 1.0 / 3.0),
    )
}

fn hue_to_channel(p: f32, q: f32, t: f32) -> f32 {
    let t = t.rem_euclid(1.0);
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}

fn is_empty(img: &RgbImage) -> bool {
    img.width() == 0 || img.height() == 0
}

fn to_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

/// Run the full pipeline for one profile. An empty image comes back as is.
pub fn apply_profile(img: &RgbImage, profile: &FilmStockProfile) -> RgbImage {
    let mut out = img.clone();
    if is_empty(&out) {
        return out;
    }

    modulate(&mut out, profile.brightness, profile.saturation, profile.hue);
    apply_gamma(&mut out, profile.gamma);
    if let Some(warmth) = &profile.warmth {
        tint(&mut out, warmth.factors());
    }
    if let Some(matrix) = &profile.channel_mix {
        recombine(&mut out, matrix);
    }
    normalize_contrast(&mut out, profile.contrast);
    if let Some(mask) = profile.sharpen {
        out = sharpen(&out, mask);
    }
    if let Some(sigma) = profile.blur {
        out = imageops::blur(&out, sigma);
    }

    out
}

/// Scale lightness and saturation, rotate hue.
pub fn modulate(img: &mut RgbImage, brightness: f32, saturation: f32, hue: f32) {
    for px in img.pixels_mut() {
        let [r, g, b] = px.0;
        let mut hsl = rgb_to_hsl(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0);
        hsl.l *= brightness;
        hsl.s *= saturation;
        hsl.h += hue;
        let (r, g, b) = hsl_to_rgb(hsl);
        px.0 = [to_u8(r * 255.0), to_u8(g * 255.0), to_u8(b * 255.0)];
    }
}

/// Gamma correction via lookup table. Gamma above 1 lifts midtones.
pub fn apply_gamma(img: &mut RgbImage, gamma: f32) {
    if gamma <= 0.0 || (gamma - 1.0).abs() < f32::EPSILON {
        return;
    }
    let exponent = 1.0 / gamma;
    let lut: [u8; 256] =
        std::array::from_fn(|i| to_u8(255.0 * (i as f32 / 255.0).powf(exponent)));
    for px in img.pixels_mut() {
        for c in px.0.iter_mut() {
            *c = lut[*c as usize];
        }
    }
}

/// Multiply each channel by its factor (0.0–1.0).
pub fn tint(img: &mut RgbImage, factors: [f32; 3]) {
    for px in img.pixels_mut() {
        for (c, f) in px.0.iter_mut().zip(factors) {
            *c = to_u8(*c as f32 * f);
        }
    }
}

/// Recombine channels with a row-major 3×3 matrix.
pub fn recombine(img: &mut RgbImage, m: &[[f32; 3]; 3]) {
    for px in img.pixels_mut() {
        let [r, g, b] = px.0.map(|c| c as f32);
        px.0 = std::array::from_fn(|row| to_u8(m[row][0] * r + m[row][1] * g + m[row][2] * b));
    }
}

fn luma(px: [u8; 3]) -> u8 {
    to_u8(0.299 * px[0] as f32 + 0.587 * px[1] as f32 + 0.114 * px[2] as f32)
}

/// Smallest luma value with at least `pct` percent of pixels at or below it.
fn percentile(histogram: &[u64; 256], total: u64, pct: f32) -> u8 {
    let target = ((pct.clamp(0.0, 100.0) / 100.0) * total as f32).ceil().max(1.0) as u64;
    let mut seen = 0u64;
    for (value, &count) in histogram.iter().enumerate() {
        seen += count;
        if seen >= target {
            return value as u8;
        }
    }
    255
}

/// Stretch the luma percentile window to the full range on every channel.
///
/// Images whose window collapses to a single value (flat images) are left
/// untouched.
pub fn normalize_contrast(img: &mut RgbImage, window: ContrastWindow) {
    let mut histogram = [0u64; 256];
    for px in img.pixels() {
        histogram[luma(px.0) as usize] += 1;
    }
    let total = img.width() as u64 * img.height() as u64;
    if total == 0 {
        return;
    }

    let lo = percentile(&histogram, total, window.lower) as f32;
    let hi = percentile(&histogram, total, window.upper) as f32;
    if hi <= lo {
        return;
    }

    let scale = 255.0 / (hi - lo);
    let lut: [u8; 256] = std::array::from_fn(|i| to_u8((i as f32 - lo) * scale));
    for px in img.pixels_mut() {
        for c in px.0.iter_mut() {
            *c = lut[*c as usize];
        }
    }
}

/// Unsharp mask: `out = in + gain · (in − blur(in))`.
///
/// The gain is `flat` where the difference is within [`FLAT_THRESHOLD`] and
/// `jagged` across stronger edges.
pub fn sharpen(img: &RgbImage, mask: UnsharpMask) -> RgbImage {
    if is_empty(img) {
        return img.clone();
    }
    let blurred = imageops::blur(img, mask.sigma);
    let mut out = img.clone();
    for (px, soft) in out.pixels_mut().zip(blurred.pixels()) {
        for (c, s) in px.0.iter_mut().zip(soft.0) {
            let diff = *c as f32 - s as f32;
            let gain = if diff.abs() <= FLAT_THRESHOLD {
                mask.flat
            } else {
                mask.jagged
            };
            *c = to_u8(*c as f32 + gain * diff);
        }
    }
    out
}
