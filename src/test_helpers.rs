//! Shared test utilities for the vintagecam test suite.
//!
//! Synthetic images (in memory, as encoded bytes, or written to disk) and a
//! config whose directories all live inside one temp dir.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! create_test_jpeg(&tmp.path().join("in.jpg"), 1200, 800);
//! let config = isolated_config(tmp.path());
//! ```

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, Rgb, RgbImage};
use std::path::Path;

use crate::config::AppConfig;

// =========================================================================
// Synthetic images
// =========================================================================

/// Colorful image with horizontal, vertical and diagonal ramps, so every
/// color stage has something to act on.
pub fn gradient_image(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        let fx = x as f32 / width.max(1) as f32;
        let fy = y as f32 / height.max(1) as f32;
        Rgb([
            (40.0 + 180.0 * fx) as u8,
            (200.0 - 150.0 * fy) as u8,
            (60.0 + 120.0 * (fx + fy) / 2.0) as u8,
        ])
    })
}

/// Encode `gradient_image(width, height)` as JPEG bytes.
pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = gradient_image(width, height);
    let mut buf = Vec::new();
    JpegEncoder::new(&mut buf)
        .write_image(img.as_raw(), width, height, ExtendedColorType::Rgb8)
        .unwrap();
    buf
}

/// Encode `gradient_image(width, height)` as PNG bytes.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = gradient_image(width, height);
    let mut buf = Vec::new();
    PngEncoder::new(&mut buf)
        .write_image(img.as_raw(), width, height, ExtendedColorType::Rgb8)
        .unwrap();
    buf
}

/// Create a small valid JPEG file with the given dimensions.
pub fn create_test_jpeg(path: &Path, width: u32, height: u32) {
    std::fs::write(path, jpeg_bytes(width, height)).unwrap();
}

/// Create a small valid PNG file with the given dimensions.
pub fn create_test_png(path: &Path, width: u32, height: u32) {
    std::fs::write(path, png_bytes(width, height)).unwrap();
}

// =========================================================================
// Configuration
// =========================================================================

/// Stock config with every directory under `root` and the network disabled.
pub fn isolated_config(root: &Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.storage.uploads_dir = root.join("uploads");
    config.storage.processed_dir = root.join("processed");
    config.storage.metadata_dir = root.join("metadata");
    config.storage.temp_dir = Some(root.join("work"));
    config.network.enabled = false;
    config
}
