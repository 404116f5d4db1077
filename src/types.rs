//! Metadata records kept in the store.
//!
//! Records are serialized to JSON text (camelCase keys) and stored under
//! `image:<id>` or `processed:<id>` with a 24-hour expiry. They are written
//! once and never mutated; the only way a record goes away is by expiring.
//!
//! Records rebuilt by directory-scan recovery only know their id, path and
//! timestamps, so everything else is optional in the serialized form.

use crate::imaging::{AspectRatio, CropRegion, FilmStock};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// How long every record lives after it is written.
pub const RECORD_TTL_SECS: u64 = 24 * 60 * 60;

/// Longest record lifetime the config accepts: one year.
pub const MAX_RECORD_TTL_SECS: u64 = 365 * RECORD_TTL_SECS;

pub fn image_key(id: &str) -> String {
    format!("image:{id}")
}

pub fn processed_key(id: &str) -> String {
    format!("processed:{id}")
}

/// An uploaded source image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRecord {
    pub id: String,
    pub path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    pub upload_time: DateTime<Utc>,
    pub expiration_time: DateTime<Utc>,
}

impl ImageRecord {
    /// Minimal record for a file found on disk without metadata.
    pub fn recovered(id: &str, path: PathBuf, now: DateTime<Utc>, ttl_secs: u64) -> Self {
        Self {
            id: id.to_string(),
            path,
            original_name: None,
            mime_type: None,
            size: None,
            upload_time: now,
            expiration_time: expiry_from(now, ttl_secs),
        }
    }
}

/// What crop a processed image was made with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AppliedCrop {
    AspectRatio(AspectRatio),
    CropData(CropRegion),
}

/// Which cosmetic effects were requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedEffects {
    pub grain: bool,
    pub vignette: bool,
}

/// A processed result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedImageRecord {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_id: Option<String>,
    pub path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applied: Option<AppliedCrop>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub film_stock: Option<FilmStock>,
    #[serde(default)]
    pub effects: AppliedEffects,
    pub processed_time: DateTime<Utc>,
    pub expiration_time: DateTime<Utc>,
}

impl ProcessedImageRecord {
    /// Minimal record for a processed file found on disk without metadata.
    pub fn recovered(id: &str, path: PathBuf, now: DateTime<Utc>, ttl_secs: u64) -> Self {
        Self {
            id: id.to_string(),
            original_id: None,
            path,
            applied: None,
            film_stock: None,
            effects: AppliedEffects::default(),
            processed_time: now,
            expiration_time: expiry_from(now, ttl_secs),
        }
    }
}

/// `now + ttl_secs`, saturating at the latest representable time.
pub fn expiry_from(now: DateTime<Utc>, ttl_secs: u64) -> DateTime<Utc> {
    i64::try_from(ttl_secs)
        .ok()
        .and_then(Duration::try_seconds)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
