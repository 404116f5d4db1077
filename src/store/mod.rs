//! Expiring key/value metadata store.
//!
//! Every backend implements [`MetadataStore`]: `set` with an optional TTL and
//! `get` that returns `None` for keys that were never set or have expired.
//!
//! | Backend | Expiry | Module |
//! |---|---|---|
//! | Redis | server-side (`SET … EX`) | [`redis`] |
//! | Local disk | lazy, checked on read | [`disk`] |
//! | Fallback selector | delegates to the active one | [`selector`] |
//!
//! Callers hold one `Arc<dyn MetadataStore>`, normally a
//! [`FallbackStore`], and never learn which backend answered.

pub mod disk;
pub mod redis;
pub mod selector;

pub use disk::DiskStore;
pub use redis::RedisStore;
pub use selector::{BackendState, FallbackStore};

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Redis error: {0}")]
    Redis(#[from] ::redis::RedisError),
    #[error("Timed out after {0:?}")]
    Timeout(Duration),
}

#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError>;

    /// Fetch the value for `key`. `None` if never set or expired.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Short backend name for logs and status output.
    fn kind(&self) -> &'static str;
}

/// Serialize `value` to JSON and store it.
pub async fn put_json<T: Serialize + Sync>(
    store: &dyn MetadataStore,
    key: &str,
    value: &T,
    ttl: Option<Duration>,
) -> Result<(), StoreError> {
    let json = serde_json::to_string(value)?;
    store.set(key, &json, ttl).await
}

/// Fetch and deserialize a JSON value.
pub async fn get_json<T: DeserializeOwned>(
    store: &dyn MetadataStore,
    key: &str,
) -> Result<Option<T>, StoreError> {
    match store.get(key).await? {
        Some(json) => Ok(Some(serde_json::from_str(&json)?)),
        None => Ok(None),
    }
}
