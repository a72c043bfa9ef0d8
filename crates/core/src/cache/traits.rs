use std::time::Duration;

use async_trait::async_trait;

use super::Result;

/// Key-value cache holding serialized snapshots.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Gets a value from the cache by key.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Sets a value in the cache with an optional TTL.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()>;

    /// Deletes a value from the cache by key.
    async fn delete(&self, key: &str) -> Result<()>;
}
