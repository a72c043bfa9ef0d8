use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use futures_util::FutureExt;
use tokio_util::sync::CancellationToken;

use repokit_core::cache::{deserialize_snapshot, serialize_snapshot, Cache, CacheError};
use repokit_core::entity::{CacheSettings, Entity};
use repokit_core::storage::{Session, Store};

use super::scope::close;
use super::unit_of_work::AfterCommit;
use super::{RepositoryError, Result};

/// Whole-collection snapshot of one entity type kept in a [`Cache`].
///
/// Reads fetch the snapshot and rebuild it once from the store when it is
/// missing. Every write rebuilds the full snapshot; there is no per-row
/// invalidation.
///
/// Known limitations:
/// - Concurrent writers each trigger a full rebuild, so heavy write traffic
///   causes a cache stampede and redundant loads.
/// - Fetch, rebuild and refetch are not atomic. A reader may see a stale
///   snapshot replaced by a fresh one between two reads.
/// - Snapshots hold rows without relations, so cached reads never carry
///   related data even when it was requested.
pub struct CacheAside<E> {
    cache: Arc<dyn Cache>,
    settings: CacheSettings,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> CacheAside<E> {
    pub fn new(cache: Arc<dyn Cache>, settings: CacheSettings) -> Self {
        Self {
            cache,
            settings,
            _entity: PhantomData,
        }
    }

    pub fn key(&self) -> &str {
        &self.settings.key
    }

    /// Returns every cached row, rebuilding the snapshot once if it is missing.
    pub async fn snapshot<S: Store>(&self, store: &S, cancel: &CancellationToken) -> Result<Vec<E>> {
        if let Some(rows) = self.fetch().await? {
            tracing::trace!(entity = E::NAME, cache_key = %self.key(), "Cache hit");
            return Ok(rows);
        }

        tracing::trace!(entity = E::NAME, cache_key = %self.key(), "Cache miss");
        self.rebuild(store, cancel).await?;

        self.fetch().await?.ok_or_else(|| {
            RepositoryError::CacheUnavailable(CacheError::OperationFailed(format!(
                "snapshot '{}' is still missing after a rebuild",
                self.key()
            )))
        })
    }

    /// Loads every row from the store and overwrites the snapshot.
    ///
    /// A cancelled rebuild never writes, so the previous snapshot stays in place.
    pub async fn rebuild<S: Store>(&self, store: &S, cancel: &CancellationToken) -> Result<()> {
        let session = store.begin().await?;
        let loaded = session.load_all::<E>(cancel).await;
        close(session).await;
        let rows = loaded?;

        let value = serialize_snapshot(&rows).map_err(CacheError::from)?;
        if cancel.is_cancelled() {
            return Err(RepositoryError::Cancelled);
        }
        self.cache.set(self.key(), &value, self.settings.ttl).await?;

        tracing::debug!(
            entity = E::NAME,
            cache_key = %self.key(),
            count = rows.len(),
            "Cache snapshot rebuilt"
        );
        Ok(())
    }

    /// Packages a rebuild to run once a unit of work has committed.
    pub fn rebuild_after_commit<S: Store>(&self, store: Arc<S>) -> AfterCommit {
        let cache = self.clone();
        Box::new(move |cancel: CancellationToken| {
            async move { cache.rebuild(store.as_ref(), &cancel).await }.boxed()
        })
    }

    /// Reads and decodes the snapshot. Empty and unreadable values count as missing.
    async fn fetch(&self) -> Result<Option<Vec<E>>> {
        let Some(value) = self.cache.get(self.key()).await? else {
            return Ok(None);
        };
        if value.is_empty() {
            return Ok(None);
        }

        match deserialize_snapshot(&value) {
            Ok(rows) => Ok(Some(rows)),
            Err(err) => {
                tracing::warn!(
                    entity = E::NAME,
                    cache_key = %self.key(),
                    error = %err,
                    "Discarding unreadable cache snapshot"
                );
                if let Err(err) = self.cache.delete(self.key()).await {
                    tracing::warn!(cache_key = %self.key(), error = %err, "Failed to discard snapshot");
                }
                Ok(None)
            }
        }
    }
}

impl<E> Clone for CacheAside<E> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
            settings: self.settings.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E> fmt::Debug for CacheAside<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheAside")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::models::Product;
    use crate::storage::InMemoryStore;
    use async_trait::async_trait;
    use repokit_core::cache::Result as CacheResult;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn settings() -> CacheSettings {
        CacheSettings {
            key: "test:products".to_string(),
            ttl: Some(Duration::from_secs(60)),
        }
    }

    // Cache whose writes always fail, counting the attempts.
    #[derive(Default)]
    struct ReadOnlyCache {
        sets: AtomicUsize,
    }

    #[async_trait]
    impl Cache for ReadOnlyCache {
        async fn get(&self, _key: &str) -> CacheResult<Option<String>> {
            Ok(None)
        }

        async fn set(&self, _key: &str, _value: &str, _ttl: Option<Duration>) -> CacheResult<()> {
            self.sets.fetch_add(1, Ordering::SeqCst);
            Err(CacheError::OperationFailed("READONLY".to_string()))
        }

        async fn delete(&self, _key: &str) -> CacheResult<()> {
            Ok(())
        }
    }

    // Cache that accepts writes but never returns them.
    struct ForgetfulCache;

    #[async_trait]
    impl Cache for ForgetfulCache {
        async fn get(&self, _key: &str) -> CacheResult<Option<String>> {
            Ok(None)
        }

        async fn set(&self, _key: &str, _value: &str, _ttl: Option<Duration>) -> CacheResult<()> {
            Ok(())
        }

        async fn delete(&self, _key: &str) -> CacheResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_miss_rebuilds_once_then_hits() {
        let store = InMemoryStore::new();
        store.seed(&[Product::new("Lamp", 10.0)]).await.unwrap();
        let cache = CacheAside::<Product>::new(Arc::new(MemoryCache::new(16)), settings());
        let cancel = CancellationToken::new();

        let first = cache.snapshot(&store, &cancel).await.unwrap();
        let second = cache.snapshot(&store, &cancel).await.unwrap();

        assert_eq!(first.len(), 1);
        assert_eq!(first, second);
        assert_eq!(store.stats().full_loads, 1);
        assert_eq!(store.stats().sessions_active, 0);
    }

    #[tokio::test]
    async fn test_empty_collection_is_cached_as_empty_array() {
        let store = InMemoryStore::new();
        let backend = Arc::new(MemoryCache::new(16));
        let cache = CacheAside::<Product>::new(backend.clone(), settings());
        let cancel = CancellationToken::new();

        assert!(cache.snapshot(&store, &cancel).await.unwrap().is_empty());
        assert!(cache.snapshot(&store, &cancel).await.unwrap().is_empty());

        assert_eq!(backend.get("test:products").await.unwrap(), Some("[]".to_string()));
        assert_eq!(store.stats().full_loads, 1);
    }

    #[tokio::test]
    async fn test_unreadable_snapshot_is_rebuilt() {
        let store = InMemoryStore::new();
        store.seed(&[Product::new("Lamp", 10.0)]).await.unwrap();
        let backend = Arc::new(MemoryCache::new(16));
        backend.set("test:products", "{corrupt", None).await.unwrap();
        let cache = CacheAside::<Product>::new(backend, settings());

        let rows = cache
            .snapshot(&store, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_rebuild_failure_surfaces_as_cache_unavailable() {
        let store = InMemoryStore::new();
        let backend = Arc::new(ReadOnlyCache::default());
        let cache = CacheAside::<Product>::new(backend.clone(), settings());

        let error = cache
            .snapshot(&store, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(error, RepositoryError::CacheUnavailable(_)));
        assert_eq!(backend.sets.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_snapshot_missing_after_rebuild_fails_instead_of_looping() {
        let store = InMemoryStore::new();
        let cache = CacheAside::<Product>::new(Arc::new(ForgetfulCache), settings());

        let error = cache
            .snapshot(&store, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(
            error,
            RepositoryError::CacheUnavailable(CacheError::OperationFailed(_))
        ));
        assert_eq!(store.stats().full_loads, 1);
    }

    #[tokio::test]
    async fn test_cancelled_rebuild_keeps_previous_snapshot() {
        let store = InMemoryStore::new();
        store.seed(&[Product::new("Lamp", 10.0)]).await.unwrap();
        let backend = Arc::new(MemoryCache::new(16));
        backend.set("test:products", "[]", None).await.unwrap();
        let cache = CacheAside::<Product>::new(backend.clone(), settings());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let error = cache.rebuild(&store, &cancel).await.unwrap_err();

        assert_eq!(error, RepositoryError::Cancelled);
        assert_eq!(backend.get("test:products").await.unwrap(), Some("[]".to_string()));
        assert_eq!(store.stats().sessions_active, 0);
    }

    #[tokio::test]
    async fn test_rebuild_after_commit_runs_rebuild() {
        let store = Arc::new(InMemoryStore::new());
        store.seed(&[Product::new("Lamp", 10.0)]).await.unwrap();
        let backend = Arc::new(MemoryCache::new(16));
        let cache = CacheAside::<Product>::new(backend.clone(), settings());

        let continuation = cache.rebuild_after_commit(Arc::clone(&store));
        assert!(backend.get("test:products").await.unwrap().is_none());

        continuation(CancellationToken::new()).await.unwrap();

        assert!(backend.get("test:products").await.unwrap().is_some());
    }
}
