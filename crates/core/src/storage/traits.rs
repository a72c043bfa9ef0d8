use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::entity::Entity;
use crate::query::{Includes, Query, Rows};

use super::Result;

/// A backing store that hands out sessions.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    type Session: Session;

    /// Opens a session. The caller owns it and must close it.
    async fn begin(&self) -> Result<Self::Session>;
}

/// A connection-scoped unit of work against a store.
///
/// Writes are staged until [`Session::commit`]; reads see committed data plus
/// the session's own staged writes. One session may serve any number of
/// entity types.
#[async_trait]
pub trait Session: Send + Sync + 'static {
    /// Runs a composed query and returns the windowed rows and the total match count.
    async fn query<E: Entity>(&self, query: &Query<E>, cancel: &CancellationToken)
        -> Result<Rows<E>>;

    /// Counts rows matching the query, ignoring its window.
    async fn count<E: Entity>(&self, query: &Query<E>, cancel: &CancellationToken)
        -> Result<usize>;

    /// Loads one row by id regardless of capability filters.
    async fn find<E: Entity>(
        &self,
        id: &E::Id,
        includes: &Includes,
        cancel: &CancellationToken,
    ) -> Result<Option<E>>;

    /// Loads every row of the entity type without relations.
    async fn load_all<E: Entity>(&self, cancel: &CancellationToken) -> Result<Vec<E>>;

    async fn insert<E: Entity>(&self, entities: &[E], cancel: &CancellationToken) -> Result<()>;

    async fn update<E: Entity>(&self, entities: &[E], cancel: &CancellationToken) -> Result<()>;

    async fn remove<E: Entity>(&self, ids: &[E::Id], cancel: &CancellationToken) -> Result<()>;

    /// Makes staged writes durable.
    async fn commit(&self) -> Result<()>;

    /// Discards staged writes.
    async fn rollback(&self) -> Result<()>;

    /// Releases the session. Uncommitted writes are discarded.
    async fn close(self) -> Result<()>
    where
        Self: Sized;
}
