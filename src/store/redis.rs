//! Redis-backed metadata store.
//!
//! Values are plain strings; TTLs become `SET key value EX seconds`, so
//! expiry is enforced by the server. One multiplexed connection is shared by
//! every call (cloning it is cheap).

use super::{MetadataStore, StoreError};
use ::redis::AsyncCommands;
use ::redis::aio::MultiplexedConnection;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

pub struct RedisStore {
    conn: MultiplexedConnection,
}

impl RedisStore {
    /// Open a client for `url` and establish the multiplexed connection.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = ::redis::Client::open(url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        debug!(url, "redis connection established");
        Ok(Self { conn })
    }
}

#[async_trait]
impl MetadataStore for RedisStore {
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        match ttl {
            // EX 0 is rejected by the server
            Some(ttl) => conn.set_ex::<_, _, ()>(key, value, ttl.as_secs().max(1)).await?,
            None => conn.set::<_, _, ()>(key, value).await?,
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    fn kind(&self) -> &'static str {
        "redis"
    }
}
