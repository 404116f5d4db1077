//! Film stock profiles.
//!
//! Each [`FilmStock`] maps to one [`FilmStockProfile`]: the numeric
//! parameters the [color pipeline](super::color) needs to emulate that film's
//! look. The table is `'static` data, so there is no locking and no lazy init.
//!
//! | Stock | Character |
//! |---|---|
//! | `classic_chrome` | muted color, hard shadows, slightly cool tint |
//! | `pro_neg_hi` | soft portrait negative, gentle warmth |
//! | `velvia` | saturated slide film, deep blues and greens |
//! | `classic_neg` | faded negative, strong warm shift, lifted blacks |
//! | `portra_400` | warm skin tones, wide latitude |
//! | `kodachrome` | punchy reds, crisp detail |
//!
//! Stock identifiers from the outside world are parsed with
//! [`FilmStock::parse`], which maps anything unrecognized to
//! [`FilmStock::ClassicChrome`]. There is exactly one fallback and it happens
//! at the boundary; the pipeline itself only ever sees a valid enum.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of supported film stocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilmStock {
    #[default]
    ClassicChrome,
    ProNegHi,
    Velvia,
    ClassicNeg,
    #[serde(rename = "portra_400")]
    Portra400,
    Kodachrome,
}

impl FilmStock {
    pub const ALL: [FilmStock; 6] = [
        FilmStock::ClassicChrome,
        FilmStock::ProNegHi,
        FilmStock::Velvia,
        FilmStock::ClassicNeg,
        FilmStock::Portra400,
        FilmStock::Kodachrome,
    ];

    /// Parse a stock identifier, falling back to `classic_chrome`.
    ///
    /// Matching is case-insensitive and ignores surrounding whitespace.
    pub fn parse(name: &str) -> Self {
        let wanted = name.trim();
        Self::ALL
            .into_iter()
            .find(|stock| stock.id().eq_ignore_ascii_case(wanted))
            .unwrap_or_default()
    }

    /// The snake_case identifier used in options, records and logs.
    pub fn id(self) -> &'static str {
        match self {
            FilmStock::ClassicChrome => "classic_chrome",
            FilmStock::ProNegHi => "pro_neg_hi",
            FilmStock::Velvia => "velvia",
            FilmStock::ClassicNeg => "classic_neg",
            FilmStock::Portra400 => "portra_400",
            FilmStock::Kodachrome => "kodachrome",
        }
    }

    /// The profile for this stock.
    pub fn profile(self) -> &'static FilmStockProfile {
        match self {
            FilmStock::ClassicChrome => &CLASSIC_CHROME,
            FilmStock::ProNegHi => &PRO_NEG_HI,
            FilmStock::Velvia => &VELVIA,
            FilmStock::ClassicNeg => &CLASSIC_NEG,
            FilmStock::Portra400 => &PORTRA_400,
            FilmStock::Kodachrome => &KODACHROME,
        }
    }
}

impl fmt::Display for FilmStock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Percentile window for contrast normalization.
///
/// Luminance at the `lower` percentile maps to black, at `upper` to white.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContrastWindow {
    pub lower: f32,
    pub upper: f32,
}

/// Per-channel tint expressed on a 0–255 scale (255 = unchanged).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Warmth {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Warmth {
    /// Channel multipliers in 0.0–1.0.
    pub fn factors(&self) -> [f32; 3] {
        [self.r / 255.0, self.g / 255.0, self.b / 255.0]
    }
}

/// Unsharp-mask parameters.
///
/// - `sigma`: Gaussian radius of the mask
/// - `flat`: gain applied where the local difference is small (smooth areas)
/// - `jagged`: gain applied across edges
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnsharpMask {
    pub sigma: f32,
    pub flat: f32,
    pub jagged: f32,
}

/// Numeric description of a film look.
///
/// `brightness`, `saturation`, `hue`, `gamma` and `contrast` are always
/// applied. Every `Option` field is a pipeline stage that is skipped when
/// `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct FilmStockProfile {
    pub brightness: f32,
    pub saturation: f32,
    /// Hue rotation in degrees.
    pub hue: f32,
    pub gamma: f32,
    pub contrast: ContrastWindow,
    pub warmth: Option<Warmth>,
    /// Row-major 3×3 RGB recombination matrix.
    pub channel_mix: Option<[[f32; 3]; 3]>,
    /// Softening blur sigma, applied after sharpening.
    pub blur: Option<f32>,
    pub sharpen: Option<UnsharpMask>,
}

pub static CLASSIC_CHROME: FilmStockProfile = FilmStockProfile {
    brightness: 1.02,
    saturation: 0.75,
    hue: 3.0,
    gamma: 1.25,
    contrast: ContrastWindow {
        lower: 8.0,
        upper: 94.0,
    },
    warmth: Some(Warmth {
        r: 252.0,
        g: 248.0,
        b: 245.0,
    }),
    channel_mix: Some([[1.02, 0.03, -0.02], [-0.02, 1.0, 0.02], [0.01, -0.01, 0.98]]),
    blur: Some(0.3),
    sharpen: Some(UnsharpMask {
        sigma: 0.4,
        flat: 0.5,
        jagged: 1.8,
    }),
};

pub static PRO_NEG_HI: FilmStockProfile = FilmStockProfile {
    brightness: 1.05,
    saturation: 0.88,
    hue: 5.0,
    gamma: 1.2,
    contrast: ContrastWindow {
        lower: 12.0,
        upper: 92.0,
    },
    warmth: Some(Warmth {
        r: 255.0,
        g: 251.0,
        b: 247.0,
    }),
    channel_mix: Some([[1.0, 0.02, -0.01], [-0.01, 1.01, 0.01], [0.02, -0.02, 1.0]]),
    blur: Some(0.3),
    sharpen: Some(UnsharpMask {
        sigma: 0.3,
        flat: 0.8,
        jagged: 1.5,
    }),
};

pub static VELVIA: FilmStockProfile = FilmStockProfile {
    brightness: 0.98,
    saturation: 1.35,
    hue: -2.0,
    gamma: 1.1,
    contrast: ContrastWindow {
        lower: 2.0,
        upper: 98.0,
    },
    warmth: Some(Warmth {
        r: 255.0,
        g: 252.0,
        b: 248.0,
    }),
    channel_mix: Some([[1.0, 0.0, 0.02], [0.0, 1.05, 0.0], [0.02, 0.0, 1.08]]),
    blur: Some(0.3),
    sharpen: Some(UnsharpMask {
        sigma: 0.6,
        flat: 0.9,
        jagged: 2.2,
    }),
};

pub static CLASSIC_NEG: FilmStockProfile = FilmStockProfile {
    brightness: 1.08,
    saturation: 0.65,
    hue: 12.0,
    gamma: 1.4,
    contrast: ContrastWindow {
        lower: 18.0,
        upper: 88.0,
    },
    warmth: Some(Warmth {
        r: 255.0,
        g: 248.0,
        b: 235.0,
    }),
    channel_mix: Some([[1.0, -0.05, 0.08], [0.05, 1.0, -0.03], [-0.02, 0.08, 1.0]]),
    blur: Some(0.35),
    sharpen: Some(UnsharpMask {
        sigma: 0.3,
        flat: 0.4,
        jagged: 1.2,
    }),
};

pub static PORTRA_400: FilmStockProfile = FilmStockProfile {
    brightness: 1.03,
    saturation: 0.92,
    hue: 8.0,
    gamma: 1.15,
    contrast: ContrastWindow {
        lower: 6.0,
        upper: 96.0,
    },
    warmth: Some(Warmth {
        r: 255.0,
        g: 250.0,
        b: 242.0,
    }),
    channel_mix: Some([[1.0, 0.02, 0.01], [0.01, 1.0, 0.0], [0.02, 0.01, 0.98]]),
    blur: Some(0.3),
    sharpen: Some(UnsharpMask {
        sigma: 0.4,
        flat: 0.6,
        jagged: 1.6,
    }),
};

pub static KODACHROME: FilmStockProfile = FilmStockProfile {
    brightness: 1.0,
    saturation: 1.2,
    hue: -5.0,
    gamma: 1.05,
    contrast: ContrastWindow {
        lower: 3.0,
        upper: 97.0,
    },
    warmth: Some(Warmth {
        r: 255.0,
        g: 248.0,
        b: 240.0,
    }),
    channel_mix: Some([[1.05, 0.0, -0.02], [0.0, 1.02, 0.02], [0.05, 0.0, 1.08]]),
    blur: Some(0.15),
    sharpen: Some(UnsharpMask {
        sigma: 0.5,
        flat: 0.8,
        jagged: 2.0,
    }),
};
