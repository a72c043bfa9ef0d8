use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use repokit_core::cache::Cache;
use repokit_core::context::RequestContext;
use repokit_core::entity::{Capabilities, Entity};
use repokit_core::query::{
    Criteria, PagedResult, Pagination, Query, ReadOptions, Rows, Scope, Sort, Window,
};
use repokit_core::storage::{Session, Store};

use super::cache_aside::CacheAside;
use super::scope::close;
use super::{RepositoryError, Result};

/// Row ceiling for reads without pagination until changed.
pub const DEFAULT_MAX_SELECT_COUNT: usize = 200;

/// CRUD over one entity type with its capability filters applied.
///
/// Capabilities are resolved once in [`new`](Self::new). Cacheable types
/// read from a whole-collection snapshot; all others read from the store.
/// Per-request copies made with [`for_request`](Self::for_request) share the
/// store, the cache, the capabilities and the max select count.
pub struct GenericRepository<E: Entity, S: Store> {
    pub(super) store: Arc<S>,
    pub(super) cache: Option<CacheAside<E>>,
    pub(super) capabilities: Arc<Capabilities>,
    max_select_count: Arc<AtomicUsize>,
    pub(super) context: RequestContext,
}

impl<E: Entity, S: Store> GenericRepository<E, S> {
    /// Builds a repository for `E`.
    ///
    /// # Errors
    ///
    /// - `CapabilityResolution` if `E` is cacheable but reports a blank key or zero expiry.
    /// - `Configuration` if `E` is cacheable and no cache is given.
    pub fn new(
        store: Arc<S>,
        cache: Option<Arc<dyn Cache>>,
        context: RequestContext,
    ) -> Result<Self> {
        let capabilities = Capabilities::resolve::<E>()?;

        let cache = match (&capabilities.cache, cache) {
            (Some(settings), Some(cache)) => Some(CacheAside::new(cache, settings.clone())),
            (Some(_), None) => {
                return Err(RepositoryError::Configuration(format!(
                    "{} is cacheable but no cache was provided",
                    E::NAME
                )));
            }
            (None, _) => None,
        };

        tracing::debug!(entity = E::NAME, capabilities = ?capabilities, "Repository created");

        Ok(Self {
            store,
            cache,
            capabilities: Arc::new(capabilities),
            max_select_count: Arc::new(AtomicUsize::new(DEFAULT_MAX_SELECT_COUNT)),
            context,
        })
    }

    /// Copy of this repository acting for another caller.
    pub fn for_request(&self, context: RequestContext) -> Self {
        Self {
            store: Arc::clone(&self.store),
            cache: self.cache.clone(),
            capabilities: Arc::clone(&self.capabilities),
            max_select_count: Arc::clone(&self.max_select_count),
            context,
        }
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub fn context(&self) -> &RequestContext {
        &self.context
    }

    pub fn max_select_count(&self) -> usize {
        self.max_select_count.load(Ordering::Relaxed)
    }

    /// Sets the row ceiling of unpaginated reads and the largest page size.
    pub fn set_max_select_count(&self, count: i64) -> Result<()> {
        let count = usize::try_from(count)
            .ok()
            .filter(|count| *count > 0)
            .ok_or_else(|| {
                RepositoryError::Configuration(format!(
                    "max select count must be greater than zero, got {count}"
                ))
            })?;
        self.max_select_count.store(count, Ordering::Relaxed);
        Ok(())
    }

    /// One page of every visible row.
    pub async fn get_all(
        &self,
        pagination: Option<Pagination>,
        sorts: Vec<Sort>,
        options: ReadOptions,
        cancel: &CancellationToken,
    ) -> Result<PagedResult<E>> {
        self.find_where(Criteria::all(), pagination, sorts, options, cancel)
            .await
    }

    /// One page of the visible rows matching `criteria`.
    pub async fn find_where(
        &self,
        criteria: Criteria<E>,
        pagination: Option<Pagination>,
        sorts: Vec<Sort>,
        options: ReadOptions,
        cancel: &CancellationToken,
    ) -> Result<PagedResult<E>> {
        let query = self
            .compose(criteria, &options)
            .sorted_by(sorts)
            .paginated(pagination, self.max_select_count())?;
        let window = query.window;
        let rows = self.fetch(&query, cancel).await?;
        Ok(PagedResult::from_rows(rows, window))
    }

    pub async fn get_by_id(
        &self,
        id: &E::Id,
        options: ReadOptions,
        cancel: &CancellationToken,
    ) -> Result<Option<E>> {
        let id = id.clone();
        let criteria = Criteria::predicate(move |entity: &E| *entity.id() == id);
        self.single_or_default(criteria, options, cancel).await
    }

    pub async fn first_or_default(
        &self,
        criteria: Criteria<E>,
        sorts: Vec<Sort>,
        options: ReadOptions,
        cancel: &CancellationToken,
    ) -> Result<Option<E>> {
        let query = self
            .compose(criteria, &options)
            .sorted_by(sorts)
            .windowed(Window::first(1));
        Ok(self.fetch(&query, cancel).await?.items.into_iter().next())
    }

    /// Last match under `sorts`, or the highest id when no sorts are given.
    pub async fn last_or_default(
        &self,
        criteria: Criteria<E>,
        sorts: Vec<Sort>,
        options: ReadOptions,
        cancel: &CancellationToken,
    ) -> Result<Option<E>> {
        let query = self
            .compose(criteria, &options)
            .sorted_by(sorts)
            .reversed()
            .windowed(Window::first(1));
        Ok(self.fetch(&query, cancel).await?.items.into_iter().next())
    }

    /// The only match, `None` without matches, `MultipleResults` with more than one.
    pub async fn single_or_default(
        &self,
        criteria: Criteria<E>,
        options: ReadOptions,
        cancel: &CancellationToken,
    ) -> Result<Option<E>> {
        let query = self.compose(criteria, &options).windowed(Window::first(2));
        let Rows { items, total } = self.fetch(&query, cancel).await?;
        if total > 1 {
            return Err(RepositoryError::MultipleResults {
                entity_type: E::NAME,
                count: total,
            });
        }
        Ok(items.into_iter().next())
    }

    /// Like [`single_or_default`](Self::single_or_default) but `NotFound` without matches.
    pub async fn single(
        &self,
        criteria: Criteria<E>,
        options: ReadOptions,
        cancel: &CancellationToken,
    ) -> Result<E> {
        self.single_or_default(criteria, options, cancel)
            .await?
            .ok_or_else(|| RepositoryError::NotFound {
                entity_type: E::NAME,
                key: "no row matches the query".to_string(),
            })
    }

    pub async fn count(
        &self,
        criteria: Criteria<E>,
        options: ReadOptions,
        cancel: &CancellationToken,
    ) -> Result<usize> {
        let query = self.compose(criteria, &options);
        self.count_matching(&query, cancel).await
    }

    pub async fn any(
        &self,
        criteria: Criteria<E>,
        options: ReadOptions,
        cancel: &CancellationToken,
    ) -> Result<bool> {
        Ok(self.count(criteria, options, cancel).await? > 0)
    }

    /// Rebuilds the cache snapshot now. Does nothing for non-cacheable types.
    pub async fn reset_cache(&self, cancel: &CancellationToken) -> Result<()> {
        match &self.cache {
            Some(cache) => cache.rebuild(self.store.as_ref(), cancel).await,
            None => Ok(()),
        }
    }

    /// Capability filters and caller criteria of a read.
    fn compose(&self, criteria: Criteria<E>, options: &ReadOptions) -> Query<E> {
        Query::compose(&self.capabilities, options, &self.context.tenant).matching(criteria)
    }

    /// Tenant filter applied to rows loaded by id for writes.
    pub(super) fn write_scope(&self) -> Scope {
        Scope::compose(
            &self.capabilities,
            &ReadOptions::default(),
            &self.context.tenant,
        )
    }

    async fn fetch(&self, query: &Query<E>, cancel: &CancellationToken) -> Result<Rows<E>> {
        query.validate()?;
        if cancel.is_cancelled() {
            return Err(RepositoryError::Cancelled);
        }

        match &self.cache {
            Some(cache) => {
                let rows = cache.snapshot(self.store.as_ref(), cancel).await?;
                Ok(query.evaluate(rows)?)
            }
            None => {
                let session = self.store.begin().await?;
                let outcome = session.query(query, cancel).await;
                close(session).await;
                Ok(outcome?)
            }
        }
    }

    async fn count_matching(&self, query: &Query<E>, cancel: &CancellationToken) -> Result<usize> {
        query.validate()?;
        if cancel.is_cancelled() {
            return Err(RepositoryError::Cancelled);
        }

        match &self.cache {
            Some(cache) => {
                let rows = cache.snapshot(self.store.as_ref(), cancel).await?;
                Ok(query.evaluate(rows)?.total)
            }
            None => {
                let session = self.store.begin().await?;
                let outcome = session.count(query, cancel).await;
                close(session).await;
                Ok(outcome?)
            }
        }
    }
}

impl<E: Entity, S: Store> Clone for GenericRepository<E, S> {
    fn clone(&self) -> Self {
        self.for_request(self.context.clone())
    }
}

impl<E: Entity, S: Store> fmt::Debug for GenericRepository<E, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenericRepository")
            .field("entity", &E::NAME)
            .field("capabilities", &self.capabilities)
            .field("cache", &self.cache)
            .field("max_select_count", &self.max_select_count())
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}
