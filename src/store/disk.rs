//! Disk-backed metadata store.
//!
//! One JSON file per key under a single directory:
//!
//! ```json
//! { "data": "<value>", "expiry": 1718000000000 }
//! ```
//!
//! `expiry` is milliseconds since the Unix epoch and absent for entries
//! written without a TTL. Keys are sanitized to `[A-Za-z0-9_-]` (anything
//! else becomes `_`) so `image:abc` lives in `image_abc.json`.
//!
//! Expiry is lazy: `get` notices a stale entry, deletes its file and reports
//! the key as absent. Unreadable or corrupt files also read as absent; the
//! problem is logged, never returned.

use super::{MetadataStore, StoreError};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageEntry {
    pub data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<i64>,
}

impl StorageEntry {
    pub fn is_expired(&self, now_millis: i64) -> bool {
        self.expiry.is_some_and(|expiry| expiry <= now_millis)
    }
}

/// `now_millis + ttl` in epoch millis, saturating instead of wrapping.
fn expiry_millis(now_millis: i64, ttl: Duration) -> i64 {
    i64::try_from(ttl.as_millis())
        .map_or(i64::MAX, |ms| now_millis.saturating_add(ms))
}

/// Replace every character outside `[A-Za-z0-9_-]` with `_`.
pub fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct DiskStore {
    dir: PathBuf,
}

impl DiskStore {
    /// Use `dir` for entry files. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sanitize_key(key)))
    }
}

#[async_trait]
impl MetadataStore for DiskStore {
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError> {
        let entry = StorageEntry {
            data: value.to_string(),
            expiry: ttl.map(|ttl| expiry_millis(Utc::now().timestamp_millis(), ttl)),
        };
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.path_for(key), serde_json::to_vec(&entry)?).await?;
        debug!(key, "stored entry on disk");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                warn!(key, error = %e, "unreadable disk entry");
                return Ok(None);
            }
        };

        let entry: StorageEntry = match serde_json::from_str(&content) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(key, error = %e, "corrupt disk entry");
                return Ok(None);
            }
        };

        if entry.is_expired(Utc::now().timestamp_millis()) {
            debug!(key, "disk entry expired");
            if let Err(e) = tokio::fs::remove_file(&path).await {
                warn!(key, error = %e, "could not remove expired entry");
            }
            return Ok(None);
        }

        Ok(Some(entry.data))
    }

    fn kind(&self) -> &'static str {
        "file"
    }
}
