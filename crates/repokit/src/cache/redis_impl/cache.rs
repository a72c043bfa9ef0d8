//! Redis-backed snapshot storage.
//!
//! Each cacheable entity type owns one key holding its whole collection as a
//! JSON array, so every operation is a single command on that key.

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;

use repokit_core::cache::{Cache, Result};

use super::error::map_redis_error;

/// Snapshot cache shared by every process pointed at the same Redis.
///
/// The connection manager reconnects on its own; clones of it are cheap and
/// one is taken per call.
pub struct RedisCache {
    conn: redis::aio::ConnectionManager,
}

impl RedisCache {
    /// Connects to `url`, e.g. `redis://localhost:6379`.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::ConnectionFailed` if the connection cannot be established.
    pub async fn new(url: &str) -> Result<Self> {
        let client = redis::Client::open(url).map_err(map_redis_error)?;
        let conn = redis::aio::ConnectionManager::new(client)
            .await
            .map_err(map_redis_error)?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        let result: Option<String> = conn.get(key).await.map_err(map_redis_error)?;
        Ok(result)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        let mut conn = self.conn.clone();

        match ttl {
            Some(duration) => {
                // SET EX takes whole seconds; sub-second snapshot expiries round up.
                let seconds = duration.as_secs().max(1);
                conn.set_ex::<_, _, ()>(key, value, seconds)
                    .await
                    .map_err(map_redis_error)?;
            }
            None => {
                conn.set::<_, _, ()>(key, value)
                    .await
                    .map_err(map_redis_error)?;
            }
        }

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(key).await.map_err(map_redis_error)?;
        Ok(())
    }
}
