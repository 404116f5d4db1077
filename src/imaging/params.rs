//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They sit between
//! the caller-facing [`ProcessOptions`] (parsed from user input, lenient) and
//! the [`backend`](super::backend) (which does the pixel work, strict). The
//! [`operations`](super::operations) module turns one into the other.
//!
//! ## Types
//!
//! - [`Quality`]: JPEG encoding quality (1–100, default 90). Clamped on construction.
//! - [`AspectRatio`]: The five named crop ratios. Unknown names become `1:1`.
//! - [`CropRegion`]: A pixel rectangle inside the source.
//! - [`GrainSize`], [`Grain`], [`Vignette`]: Cosmetic effect settings.
//! - [`ProcessOptions`]: The user-facing option bag, serialized in camelCase.
//! - [`RenderParams`]: Fully resolved description of one render.

use super::profiles::FilmStock;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

/// Named crop aspect ratio (width : height).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AspectRatio {
    /// 1:1
    #[default]
    Square,
    /// 4:3
    Standard,
    /// 16:9
    Widescreen,
    /// 3:2
    Classic,
    /// 4:5
    Portrait,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 5] = [
        AspectRatio::Square,
        AspectRatio::Standard,
        AspectRatio::Widescreen,
        AspectRatio::Classic,
        AspectRatio::Portrait,
    ];

    /// Parse a `"w:h"` label, falling back to `1:1` for anything else.
    pub fn parse(label: &str) -> Self {
        let wanted = label.trim();
        Self::ALL
            .into_iter()
            .find(|r| r.label() == wanted)
            .unwrap_or_default()
    }

    pub fn label(self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Standard => "4:3",
            AspectRatio::Widescreen => "16:9",
            AspectRatio::Classic => "3:2",
            AspectRatio::Portrait => "4:5",
        }
    }

    /// Width divided by height.
    pub fn value(self) -> f64 {
        match self {
            AspectRatio::Square => 1.0,
            AspectRatio::Standard => 4.0 / 3.0,
            AspectRatio::Widescreen => 16.0 / 9.0,
            AspectRatio::Classic => 3.0 / 2.0,
            AspectRatio::Portrait => 4.0 / 5.0,
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for AspectRatio {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for AspectRatio {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Ok(AspectRatio::parse(&label))
    }
}

/// A rectangle in source pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// How the crop rectangle is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CropSelection {
    Ratio(AspectRatio),
    Custom(CropRegion),
}

/// Grain coarseness. Each size maps to the standard deviation of the noise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GrainSize {
    #[default]
    Fine,
    Medium,
    Coarse,
}

impl GrainSize {
    /// Parse `fine` / `medium` / `coarse`, falling back to `fine`.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "medium" => GrainSize::Medium,
            "coarse" => GrainSize::Coarse,
            _ => GrainSize::Fine,
        }
    }

    pub fn sigma(self) -> f32 {
        match self {
            GrainSize::Fine => 8.0,
            GrainSize::Medium => 12.0,
            GrainSize::Coarse => 18.0,
        }
    }
}

impl<'de> Deserialize<'de> for GrainSize {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(GrainSize::parse(&name))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grain {
    pub intensity: f32,
    pub size: GrainSize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vignette {
    pub intensity: f32,
    /// Fraction of the half-diagonal at which the mask reaches its floor.
    pub radius: f32,
}

pub const DEFAULT_VIGNETTE_RADIUS: f32 = 0.8;

fn lenient_stock<'de, D: Deserializer<'de>>(deserializer: D) -> Result<FilmStock, D::Error> {
    let name = String::deserialize(deserializer)?;
    Ok(FilmStock::parse(&name))
}

/// User-facing processing options.
///
/// Every field has a default, so `{}` is a valid request. Unknown ratio,
/// stock and grain-size names fall back to their defaults instead of failing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProcessOptions {
    pub aspect_ratio: AspectRatio,
    #[serde(deserialize_with = "lenient_stock")]
    pub film_stock: FilmStock,
    /// Presence selects custom-crop mode; `aspect_ratio` is then ignored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crop_data: Option<CropRegion>,
    pub add_grain: bool,
    pub grain_intensity: f32,
    pub grain_size: GrainSize,
    pub add_vignette: bool,
    pub vignette_intensity: f32,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            aspect_ratio: AspectRatio::Square,
            film_stock: FilmStock::ClassicChrome,
            crop_data: None,
            add_grain: false,
            grain_intensity: 0.15,
            grain_size: GrainSize::Fine,
            add_vignette: false,
            vignette_intensity: 0.3,
        }
    }
}

impl ProcessOptions {
    pub fn crop_selection(&self) -> CropSelection {
        match self.crop_data {
            Some(region) => CropSelection::Custom(region),
            None => CropSelection::Ratio(self.aspect_ratio),
        }
    }

    pub fn grain(&self) -> Option<Grain> {
        self.add_grain.then_some(Grain {
            intensity: self.grain_intensity,
            size: self.grain_size,
        })
    }

    pub fn vignette(&self, radius: f32) -> Option<Vignette> {
        self.add_vignette.then_some(Vignette {
            intensity: self.vignette_intensity,
            radius,
        })
    }
}

/// Render-wide settings that do not come from the request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderSettings {
    pub quality: Quality,
    pub vignette_radius: f32,
    /// Fixed grain seed. `None` draws from the OS.
    pub seed: Option<u64>,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            quality: Quality::default(),
            vignette_radius: DEFAULT_VIGNETTE_RADIUS,
            seed: None,
        }
    }
}

/// Fully resolved parameters for one render: crop already clamped, stock
/// already resolved, effects present only when requested.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderParams {
    pub source: PathBuf,
    pub output: PathBuf,
    pub crop: CropRegion,
    pub stock: FilmStock,
    pub grain: Option<Grain>,
    pub vignette: Option<Vignette>,
    pub quality: Quality,
    pub seed: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_clamps_to_valid_range() {
        assert_eq!(Quality::new(0).value(), 1);
        assert_eq!(Quality::new(50).value(), 50);
        assert_eq!(Quality::new(150).value(), 100);
    }

    #[test]
    fn aspect_ratio_parse_known_and_fallback() {
        assert_eq!(AspectRatio::parse("16:9"), AspectRatio::Widescreen);
        assert_eq!(AspectRatio::parse("4:5"), AspectRatio::Portrait);
        assert_eq!(AspectRatio::parse("21:9"), AspectRatio::Square);
        assert_eq!(AspectRatio::parse(""), AspectRatio::Square);
    }

    #[test]
    fn grain_size_sigma() {
        assert_eq!(GrainSize::Fine.sigma(), 8.0);
        assert_eq!(GrainSize::Medium.sigma(), 12.0);
        assert_eq!(GrainSize::Coarse.sigma(), 18.0);
        assert_eq!(GrainSize::parse("huge"), GrainSize::Fine);
    }

    #[test]
    fn options_default_from_empty_json() {
        let opts: ProcessOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(opts, ProcessOptions::default());
        assert_eq!(opts.grain_intensity, 0.15);
        assert_eq!(opts.vignette_intensity, 0.3);
        assert_eq!(opts.crop_selection(), CropSelection::Ratio(AspectRatio::Square));
    }

    #[test]
    fn options_use_camel_case_names() {
        let json = r#"{
            "aspectRatio": "3:2",
            "filmStock": "kodachrome",
            "cropData": {"x": 1, "y": 2, "width": 30, "height": 40},
            "addGrain": true,
            "grainIntensity": 0.5,
            "grainSize": "coarse",
            "addVignette": true,
            "vignetteIntensity": 0.6
        }"#;
        let opts: ProcessOptions = serde_json::from_str(json).unwrap();
        assert_eq!(opts.aspect_ratio, AspectRatio::Classic);
        assert_eq!(opts.film_stock, FilmStock::Kodachrome);
        assert_eq!(
            opts.crop_selection(),
            CropSelection::Custom(CropRegion {
                x: 1,
                y: 2,
                width: 30,
                height: 40
            })
        );
        assert_eq!(
            opts.grain(),
            Some(Grain {
                intensity: 0.5,
                size: GrainSize::Coarse
            })
        );
        assert_eq!(opts.vignette(0.8).map(|v| v.intensity), Some(0.6));

        let back = serde_json::to_value(&opts).unwrap();
        assert_eq!(back["filmStock"], "kodachrome");
        assert_eq!(back["aspectRatio"], "3:2");
        assert_eq!(back["grainSize"], "coarse");
    }

    #[test]
    fn options_unknown_stock_falls_back() {
        let opts: ProcessOptions =
            serde_json::from_str(r#"{"filmStock": "ektachrome"}"#).unwrap();
        assert_eq!(opts.film_stock, FilmStock::ClassicChrome);
    }

    #[test]
    fn effects_absent_unless_requested() {
        let opts = ProcessOptions::default();
        assert_eq!(opts.grain(), None);
        assert_eq!(opts.vignette(DEFAULT_VIGNETTE_RADIUS), None);
    }
}
