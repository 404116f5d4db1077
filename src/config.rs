//! Application configuration module.
//!
//! Handles loading, validating, and merging `config.toml`. Stock defaults are
//! overridden by the user's file, then by the `REDIS_URL` environment
//! variable.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [storage]
//! uploads_dir = "uploads"       # Uploaded originals, named <id><ext>
//! processed_dir = "processed"   # Processed results, named <id><ext>
//! metadata_dir = "metadata"     # Disk metadata store (one JSON file per key)
//! # temp_dir = "/tmp"           # Per-request working dirs (default: OS temp dir)
//! ttl_seconds = 86400           # Lifetime of every metadata record (max one year)
//!
//! [network]
//! enabled = true
//! redis_url = "redis://127.0.0.1:6379"
//! connect_timeout_ms = 5000
//!
//! [admission]
//! memory_threshold = 0.95       # Used-memory fraction that refuses new work
//! retry_after_secs = 30
//!
//! [output]
//! jpeg_quality = 90
//! max_upload_bytes = 10485760   # 10 MiB
//!
//! [defaults]
//! aspect_ratio = "1:1"
//! film_stock = "classic_chrome"
//! grain_intensity = 0.15
//! grain_size = "fine"
//! vignette_intensity = 0.3
//! vignette_radius = 0.8
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse: override just the values you want:
//!
//! ```toml
//! [defaults]
//! film_stock = "velvia"
//! ```
//!
//! Unknown keys are rejected to catch typos early. Names in `[defaults]` are
//! checked strictly here, unlike request options which fall back silently.

use crate::imaging::{
    AspectRatio, FilmStock, GrainSize, ProcessOptions, Quality, RenderSettings,
};
use crate::types::MAX_RECORD_TTL_SECS;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable that overrides `network.redis_url`.
pub const REDIS_URL_ENV: &str = "REDIS_URL";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Application configuration loaded from `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub network: NetworkConfig,
    pub admission: AdmissionConfig,
    pub output: OutputConfig,
    pub defaults: DefaultsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    pub uploads_dir: PathBuf,
    pub processed_dir: PathBuf,
    pub metadata_dir: PathBuf,
    /// Parent for per-request working directories. `None` uses the OS temp dir.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temp_dir: Option<PathBuf>,
    pub ttl_seconds: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            uploads_dir: "uploads".into(),
            processed_dir: "processed".into(),
            metadata_dir: "metadata".into(),
            temp_dir: None,
            ttl_seconds: crate::types::RECORD_TTL_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NetworkConfig {
    /// When false, the disk store is used without trying the network.
    pub enabled: bool,
    pub redis_url: String,
    pub connect_timeout_ms: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            redis_url: "redis://127.0.0.1:6379".to_string(),
            connect_timeout_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AdmissionConfig {
    pub memory_threshold: f64,
    pub retry_after_secs: u64,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            memory_threshold: 0.95,
            retry_after_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub jpeg_quality: u32,
    pub max_upload_bytes: u64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: 90,
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Defaults for options a request leaves out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DefaultsConfig {
    pub aspect_ratio: String,
    pub film_stock: String,
    pub grain_intensity: f32,
    pub grain_size: String,
    pub vignette_intensity: f32,
    pub vignette_radius: f32,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            aspect_ratio: "1:1".to_string(),
            film_stock: "classic_chrome".to_string(),
            grain_intensity: 0.15,
            grain_size: "fine".to_string(),
            vignette_intensity: 0.3,
            vignette_radius: 0.8,
        }
    }
}

impl DefaultsConfig {
    /// Options with every value taken from this section and no effects enabled.
    pub fn base_options(&self) -> ProcessOptions {
        ProcessOptions {
            aspect_ratio: AspectRatio::parse(&self.aspect_ratio),
            film_stock: FilmStock::parse(&self.film_stock),
            crop_data: None,
            add_grain: false,
            grain_intensity: self.grain_intensity,
            grain_size: GrainSize::parse(&self.grain_size),
            add_vignette: false,
            vignette_intensity: self.vignette_intensity,
        }
    }
}

fn in_unit(v: f64, inclusive_zero: bool) -> bool {
    (if inclusive_zero { v >= 0.0 } else { v > 0.0 }) && v <= 1.0
}

impl AppConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Validation(msg.into()));

        if !(1..=MAX_RECORD_TTL_SECS).contains(&self.storage.ttl_seconds) {
            return invalid("storage.ttl_seconds must be between 1 and 31536000 (one year)");
        }
        if self.network.connect_timeout_ms == 0 {
            return invalid("network.connect_timeout_ms must be positive");
        }
        if !in_unit(self.admission.memory_threshold, false) {
            return invalid("admission.memory_threshold must be in (0, 1]");
        }
        if !(1..=100).contains(&self.output.jpeg_quality) {
            return invalid("output.jpeg_quality must be 1-100");
        }
        if self.output.max_upload_bytes == 0 {
            return invalid("output.max_upload_bytes must be positive");
        }

        let d = &self.defaults;
        if !AspectRatio::ALL
            .iter()
            .any(|r| r.label() == d.aspect_ratio)
        {
            return invalid("defaults.aspect_ratio must be one of 1:1, 4:3, 16:9, 3:2, 4:5");
        }
        if !FilmStock::ALL.iter().any(|s| s.id() == d.film_stock) {
            return Err(ConfigError::Validation(format!(
                "defaults.film_stock '{}' is not a known film stock",
                d.film_stock
            )));
        }
        if !["fine", "medium", "coarse"].contains(&d.grain_size.as_str()) {
            return invalid("defaults.grain_size must be fine, medium or coarse");
        }
        if !in_unit(d.grain_intensity as f64, false) {
            return invalid("defaults.grain_intensity must be in (0, 1]");
        }
        if !in_unit(d.vignette_intensity as f64, true) {
            return invalid("defaults.vignette_intensity must be in [0, 1]");
        }
        if !in_unit(d.vignette_radius as f64, false) {
            return invalid("defaults.vignette_radius must be in (0, 1]");
        }
        Ok(())
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.storage.ttl_seconds)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.network.connect_timeout_ms)
    }

    pub fn retry_after(&self) -> Duration {
        Duration::from_secs(self.admission.retry_after_secs)
    }

    pub fn temp_root(&self) -> PathBuf {
        self.storage
            .temp_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }

    pub fn render_settings(&self) -> RenderSettings {
        RenderSettings {
            quality: Quality::new(self.output.jpeg_quality),
            vignette_radius: self.defaults.vignette_radius,
            seed: None,
        }
    }

    /// Apply environment overrides. `lookup` is `std::env::var` in production.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(REDIS_URL_ENV).filter(|u| !u.trim().is_empty()) {
            self.network.redis_url = url;
        }
    }
}

/// Stock defaults as a TOML value, the base every overlay merges onto.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(AppConfig::default())?)
}

/// Deep-merge two TOML values. Overlay wins.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value. `Ok(None)` if it does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<AppConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: AppConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from the given file, falling back to stock defaults when the
/// file is absent.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let overlay = load_raw_config(path)?;
    resolve_config(stock_defaults_value()?, overlay)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# VintageCam Configuration
# ========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Storage
# ---------------------------------------------------------------------------
[storage]
# Uploaded originals are stored here as <id><ext>.
uploads_dir = "uploads"

# Processed results are stored here as <id><ext>.
processed_dir = "processed"

# Disk metadata store: one JSON file per record.
metadata_dir = "metadata"

# Parent directory for per-request working directories.
# Omit to use the operating system's temp directory.
# temp_dir = "/tmp"

# How long upload and processing records live, in seconds (1 to 31536000).
# Image files are not deleted when their record expires.
ttl_seconds = 86400

# ---------------------------------------------------------------------------
# Network metadata store (Redis)
# ---------------------------------------------------------------------------
[network]
# Set to false to always use the disk store.
enabled = true

# Overridden by the REDIS_URL environment variable.
redis_url = "redis://127.0.0.1:6379"

# Give up on the connection after this long and stay on disk.
connect_timeout_ms = 5000

# ---------------------------------------------------------------------------
# Admission
# ---------------------------------------------------------------------------
[admission]
# Refuse new processing when this fraction of memory is in use.
memory_threshold = 0.95

# Suggested wait before retrying a refused request.
retry_after_secs = 30

# ---------------------------------------------------------------------------
# Output
# ---------------------------------------------------------------------------
[output]
# JPEG encoding quality (1 = worst, 100 = best). PNG is lossless.
jpeg_quality = 90

# Largest accepted upload, in bytes (10 MiB).
max_upload_bytes = 10485760

# ---------------------------------------------------------------------------
# Processing defaults (used when a request leaves an option out)
# ---------------------------------------------------------------------------
[defaults]
# One of "1:1", "4:3", "16:9", "3:2", "4:5".
aspect_ratio = "1:1"

# One of classic_chrome, pro_neg_hi, velvia, classic_neg, portra_400, kodachrome.
film_stock = "classic_chrome"

# Grain strength in (0, 1] and size: fine, medium or coarse.
grain_intensity = 0.15
grain_size = "fine"

# Vignette strength in [0, 1] and radius as a fraction of the half-diagonal.
vignette_intensity = 0.3
vignette_radius = 0.8
"##
}
