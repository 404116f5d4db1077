//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the operations every backend must
//! support: identify, render, and strip_metadata.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate. Tests use the recording `MockBackend` below.

use super::params::RenderParams;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Source image not found: {}", .0.display())]
    SourceNotFound(PathBuf),
    #[error("Could not decode image: {0}")]
    Decode(String),
    #[error("Crop region too small: {width}x{height} (minimum 10x10)")]
    InvalidCrop { width: u32, height: u32 },
    #[error("Could not encode image: {0}")]
    Encode(String),
    #[error("Unsupported output format: {0}")]
    UnsupportedFormat(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Trait for image processing backends.
///
/// Everything above this trait (planning, the studio, batch runs) is
/// backend-agnostic.
pub trait ImageBackend: Sync {
    /// Get image dimensions. Fails with `Decode` for non-image input.
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError>;

    /// Execute a full render: decode, crop, grade, effects, encode.
    ///
    /// The output file is written only after every stage succeeded.
    fn render(&self, params: &RenderParams) -> Result<(), BackendError>;

    /// Re-encode a file in place without its embedded metadata (EXIF, ICC).
    fn strip_metadata(&self, path: &Path) -> Result<(), BackendError>;
}
