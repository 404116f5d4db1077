//! Image processing: crop, film look, grain, vignette.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::image_dimensions` |
//! | **Crop** | pure geometry + `imageops::crop_imm` |
//! | **Film look** | HSL modulate, gamma, tint, channel mix, contrast, unsharp mask, blur |
//! | **Grain / vignette** | `rand_distr` noise and radial mask, best-effort |
//! | **Encode** | JPEG or PNG, chosen by output extension |
//!
//! The module is split into:
//! - **Profiles**: The static film-stock table
//! - **Calculations**: Pure crop geometry (unit testable)
//! - **Parameters**: Data structures describing a render
//! - **Color / Effects**: Pixel stages
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining calculations + backend

pub mod backend;
mod calculations;
pub mod color;
pub mod effects;
pub mod operations;
mod params;
pub mod profiles;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::{MIN_CROP_EDGE, calculate_ratio_crop, clamp_custom_crop, resolve_crop};
pub use operations::{get_dimensions, plan_render, process_image};
pub use params::{
    AspectRatio, CropRegion, CropSelection, DEFAULT_VIGNETTE_RADIUS, Grain, GrainSize,
    ProcessOptions, Quality, RenderParams, RenderSettings, Vignette,
};
pub use profiles::{FilmStock, FilmStockProfile};
pub use rust_backend::{RustBackend, process_bytes};
