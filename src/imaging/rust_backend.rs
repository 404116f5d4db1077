//! Pure Rust image processing backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG) | `image` crate decoders |
//! | Crop | `image::imageops::crop_imm` |
//! | Film look | [`color::apply_profile`](super::color::apply_profile) |
//! | Grain | `rand_distr::Normal` noise field, overlay blend |
//! | Vignette | radial mask, multiply blend |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` |
//! | Encode → PNG | `image::codecs::png::PngEncoder` |
//!
//! All pixel work runs on the calling thread. Encoding happens into memory;
//! the output file is only created once the encoded bytes exist.

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::calculations::resolve_crop;
use super::color::apply_profile;
use super::effects::{add_grain, add_vignette};
use super::params::{CropRegion, Grain, ProcessOptions, Quality, RenderParams, RenderSettings, Vignette};
use super::profiles::FilmStock;
use crate::naming::OutputFormat;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, ImageReader, RgbImage, imageops};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::io::Write;
use std::path::Path;

/// Quality used when re-encoding a JPEG upload to drop its metadata.
const STRIP_QUALITY: Quality = Quality(95);

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn grain_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

fn format_for(path: &Path) -> Result<OutputFormat, BackendError> {
    OutputFormat::from_path(path).ok_or_else(|| {
        BackendError::UnsupportedFormat(
            path.extension()
                .and_then(|e| e.to_str())
                .unwrap_or("")
                .to_string(),
        )
    })
}

/// Load and decode an image from disk into RGB8.
fn load_image(path: &Path) -> Result<RgbImage, BackendError> {
    if !path.exists() {
        return Err(BackendError::SourceNotFound(path.to_path_buf()));
    }
    let img = ImageReader::open(path)?
        .with_guessed_format()?
        .decode()
        .map_err(|e| BackendError::Decode(format!("{}: {}", path.display(), e)))?;
    Ok(img.to_rgb8())
}

fn encode(img: &RgbImage, format: OutputFormat, quality: Quality) -> Result<Vec<u8>, BackendError> {
    let mut buf = Vec::new();
    let (width, height) = img.dimensions();
    let result = match format {
        OutputFormat::Jpeg => JpegEncoder::new_with_quality(&mut buf, quality.value() as u8)
            .write_image(img.as_raw(), width, height, ExtendedColorType::Rgb8),
        OutputFormat::Png => {
            PngEncoder::new(&mut buf).write_image(img.as_raw(), width, height, ExtendedColorType::Rgb8)
        }
    };
    result.map_err(|e| BackendError::Encode(e.to_string()))?;
    Ok(buf)
}

/// Crop, grade and apply effects. Infallible once the crop is valid.
fn develop(
    img: &RgbImage,
    crop: CropRegion,
    stock: FilmStock,
    grain: Option<&Grain>,
    vignette: Option<&Vignette>,
    rng: &mut StdRng,
) -> RgbImage {
    let cropped = imageops::crop_imm(img, crop.x, crop.y, crop.width, crop.height).to_image();
    let mut out = apply_profile(&cropped, stock.profile());
    if let Some(grain) = grain {
        out = add_grain(&out, grain, rng);
    }
    if let Some(vignette) = vignette {
        out = add_vignette(&out, vignette);
    }
    out
}

/// Run the whole pipeline on in-memory bytes and return the encoded result.
pub fn process_bytes(
    bytes: &[u8],
    format: OutputFormat,
    options: &ProcessOptions,
    settings: &RenderSettings,
) -> Result<Vec<u8>, BackendError> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| BackendError::Decode(e.to_string()))?
        .to_rgb8();
    let crop = resolve_crop(img.dimensions(), options.crop_selection())?;
    let out = develop(
        &img,
        crop,
        options.film_stock,
        options.grain().as_ref(),
        options.vignette(settings.vignette_radius).as_ref(),
        &mut grain_rng(settings.seed),
    );
    encode(&out, format, settings.quality)
}

impl ImageBackend for RustBackend {
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
        if !path.exists() {
            return Err(BackendError::SourceNotFound(path.to_path_buf()));
        }
        let (width, height) = image::image_dimensions(path)
            .map_err(|e| BackendError::Decode(format!("{}: {}", path.display(), e)))?;
        Ok(Dimensions { width, height })
    }

    fn render(&self, params: &RenderParams) -> Result<(), BackendError> {
        let format = format_for(&params.output)?;
        let img = load_image(&params.source)?;

        let (w, h) = img.dimensions();
        let crop = params.crop;
        let past_edge = |start: u32, len: u32, limit: u32| {
            start.checked_add(len).is_none_or(|end| end > limit)
        };
        if crop.width == 0
            || crop.height == 0
            || past_edge(crop.x, crop.width, w)
            || past_edge(crop.y, crop.height, h)
        {
            return Err(BackendError::InvalidCrop {
                width: crop.width,
                height: crop.height,
            });
        }

        let out = develop(
            &img,
            crop,
            params.stock,
            params.grain.as_ref(),
            params.vignette.as_ref(),
            &mut grain_rng(params.seed),
        );
        let bytes = encode(&out, format, params.quality)?;
        std::fs::write(&params.output, bytes)?;
        Ok(())
    }

    fn strip_metadata(&self, path: &Path) -> Result<(), BackendError> {
        let format = format_for(path)?;
        let img = load_image(path)?;
        let bytes = encode(&img, format, STRIP_QUALITY)?;

        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&bytes)?;
        tmp.persist(path).map_err(|e| BackendError::Io(e.error))?;
        Ok(())
    }
}
