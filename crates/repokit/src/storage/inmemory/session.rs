use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;

use repokit_core::entity::Entity;
use repokit_core::query::{Includes, Query, Rows, Window};
use repokit_core::storage::{Result, Session, StoreError};

use super::store::{decode, encode, row_key, Counters, Table, Tables};

/// A write waiting for commit.
#[derive(Debug, Clone)]
enum Change {
    Insert {
        table: &'static str,
        key: String,
        row: Value,
    },
    Update {
        table: &'static str,
        key: String,
        row: Value,
    },
    Remove {
        table: &'static str,
        key: String,
    },
}

impl Change {
    fn table(&self) -> &'static str {
        match self {
            Self::Insert { table, .. } | Self::Update { table, .. } | Self::Remove { table, .. } => {
                *table
            }
        }
    }

    /// Applies the change, failing if the target row is in the wrong state.
    fn apply(self, rows: &mut Table) -> Result<()> {
        match self {
            Self::Insert { table, key, row } => {
                if rows.contains_key(&key) {
                    return Err(StoreError::AlreadyExists {
                        entity_type: table,
                        id: key,
                    });
                }
                rows.insert(key, row);
            }
            Self::Update { table, key, row } => {
                let Some(slot) = rows.get_mut(&key) else {
                    return Err(StoreError::NotFound {
                        entity_type: table,
                        id: key,
                    });
                };
                *slot = row;
            }
            Self::Remove { table, key } => {
                if rows.remove(&key).is_none() {
                    return Err(StoreError::NotFound {
                        entity_type: table,
                        id: key,
                    });
                }
            }
        }
        Ok(())
    }
}

/// Session over an [`InMemoryStore`](super::InMemoryStore).
///
/// Reads see committed rows with this session's staged changes laid on top.
/// Writes are validated when staged and again on commit, since another
/// session may have committed in between.
pub struct InMemorySession {
    tables: Arc<RwLock<Tables>>,
    counters: Arc<Counters>,
    staged: Mutex<Vec<Change>>,
}

impl InMemorySession {
    pub(super) fn new(tables: Arc<RwLock<Tables>>, counters: Arc<Counters>) -> Self {
        Self {
            tables,
            counters,
            staged: Mutex::new(Vec::new()),
        }
    }

    /// Number of writes waiting for commit.
    pub async fn staged_len(&self) -> usize {
        self.staged.lock().await.len()
    }

    /// Committed rows of `table` with the staged changes applied.
    async fn view(&self, table: &'static str) -> Result<Table> {
        let mut rows = {
            let tables = self.tables.read().await;
            tables.get(table).cloned().unwrap_or_default()
        };
        let staged = self.staged.lock().await;
        for change in staged.iter().filter(|c| c.table() == table) {
            change.clone().apply(&mut rows)?;
        }
        Ok(rows)
    }

    async fn rows<E: Entity>(&self) -> Result<Vec<E>> {
        self.view(E::NAME)
            .await?
            .values()
            .map(decode::<E>)
            .collect()
    }

    /// Validates `changes` against the current view and stages them.
    async fn stage(&self, table: &'static str, changes: Vec<Change>) -> Result<()> {
        let mut rows = self.view(table).await?;
        for change in &changes {
            change.clone().apply(&mut rows)?;
        }
        self.staged.lock().await.extend(changes);
        Ok(())
    }
}

fn check(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(StoreError::Cancelled);
    }
    Ok(())
}

fn invalid_query(err: impl std::fmt::Display) -> StoreError {
    StoreError::QueryFailed(err.to_string())
}

#[async_trait]
impl Session for InMemorySession {
    async fn query<E: Entity>(
        &self,
        query: &Query<E>,
        cancel: &CancellationToken,
    ) -> Result<Rows<E>> {
        check(cancel)?;
        let rows = self.rows::<E>().await?;
        query.evaluate(rows).map_err(invalid_query)
    }

    async fn count<E: Entity>(&self, query: &Query<E>, cancel: &CancellationToken) -> Result<usize> {
        check(cancel)?;
        let rows = self.rows::<E>().await?;
        let unbounded = query.clone().windowed(Window::unbounded());
        Ok(unbounded.evaluate(rows).map_err(invalid_query)?.total)
    }

    async fn find<E: Entity>(
        &self,
        id: &E::Id,
        includes: &Includes,
        cancel: &CancellationToken,
    ) -> Result<Option<E>> {
        check(cancel)?;
        let rows = self.view(E::NAME).await?;
        let Some(value) = rows.get(&row_key::<E>(id)) else {
            return Ok(None);
        };
        let mut row: E = decode(value)?;
        row.retain_relations(includes);
        Ok(Some(row))
    }

    async fn load_all<E: Entity>(&self, cancel: &CancellationToken) -> Result<Vec<E>> {
        check(cancel)?;
        self.counters.full_loads.fetch_add(1, Ordering::SeqCst);
        let mut rows = self.rows::<E>().await?;
        for row in &mut rows {
            row.retain_relations(&Includes::None);
        }
        Ok(rows)
    }

    async fn insert<E: Entity>(&self, entities: &[E], cancel: &CancellationToken) -> Result<()> {
        check(cancel)?;
        let changes = entities
            .iter()
            .map(|entity| {
                Ok(Change::Insert {
                    table: E::NAME,
                    key: row_key::<E>(entity.id()),
                    row: encode(entity)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        self.stage(E::NAME, changes).await
    }

    async fn update<E: Entity>(&self, entities: &[E], cancel: &CancellationToken) -> Result<()> {
        check(cancel)?;
        let changes = entities
            .iter()
            .map(|entity| {
                Ok(Change::Update {
                    table: E::NAME,
                    key: row_key::<E>(entity.id()),
                    row: encode(entity)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        self.stage(E::NAME, changes).await
    }

    async fn remove<E: Entity>(&self, ids: &[E::Id], cancel: &CancellationToken) -> Result<()> {
        check(cancel)?;
        let changes = ids
            .iter()
            .map(|id| Change::Remove {
                table: E::NAME,
                key: row_key::<E>(id),
            })
            .collect();
        self.stage(E::NAME, changes).await
    }

    async fn commit(&self) -> Result<()> {
        let changes = std::mem::take(&mut *self.staged.lock().await);

        let mut tables = self.tables.write().await;
        let mut touched: HashMap<&'static str, Table> = HashMap::new();
        for change in changes {
            let table = change.table();
            let rows = touched
                .entry(table)
                .or_insert_with(|| tables.get(table).cloned().unwrap_or_default());
            change.apply(rows)?;
        }
        tables.extend(touched);

        self.counters.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(&self) -> Result<()> {
        self.staged.lock().await.clear();
        self.counters.rollbacks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(self) -> Result<()> {
        self.counters.sessions_active.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Product;
    use crate::storage::{InMemoryStore, StoreStats};
    use repokit_core::context::TenantContext;
    use repokit_core::entity::Capabilities;
    use repokit_core::query::{Criteria, ReadOptions};
    use repokit_core::storage::Store;

    fn query_all() -> Query<Product> {
        let caps = Capabilities::resolve::<Product>().unwrap();
        Query::compose(
            &caps,
            &ReadOptions::default().with_inactive().with_deleted(),
            &TenantContext::ignoring_tenancy(),
        )
    }

    #[tokio::test]
    async fn test_staged_rows_visible_only_to_own_session_until_commit() {
        let store = InMemoryStore::new();
        let cancel = CancellationToken::new();
        let writer = store.begin().await.unwrap();
        let reader = store.begin().await.unwrap();

        writer
            .insert(&[Product::new("Lamp", 10.0)], &cancel)
            .await
            .unwrap();

        assert_eq!(writer.count(&query_all(), &cancel).await.unwrap(), 1);
        assert_eq!(reader.count(&query_all(), &cancel).await.unwrap(), 0);

        writer.commit().await.unwrap();

        assert_eq!(reader.count(&query_all(), &cancel).await.unwrap(), 1);
        writer.close().await.unwrap();
        reader.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_rollback_discards_staged_writes() {
        let store = InMemoryStore::new();
        let cancel = CancellationToken::new();
        let session = store.begin().await.unwrap();

        session
            .insert(&[Product::new("Lamp", 10.0)], &cancel)
            .await
            .unwrap();
        assert_eq!(session.staged_len().await, 1);

        session.rollback().await.unwrap();
        session.commit().await.unwrap();
        session.close().await.unwrap();

        assert!(store.committed_rows::<Product>().await.unwrap().is_empty());
        assert_eq!(store.stats().rollbacks, 1);
    }

    #[tokio::test]
    async fn test_duplicate_insert_rejected_when_staged() {
        let store = InMemoryStore::new();
        let cancel = CancellationToken::new();
        let product = Product::new("Lamp", 10.0);
        store.seed(std::slice::from_ref(&product)).await.unwrap();

        let session = store.begin().await.unwrap();
        let result = session.insert(&[product], &cancel).await;

        assert!(matches!(result, Err(StoreError::AlreadyExists { .. })));
        assert_eq!(session.staged_len().await, 0);
        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_commit_revalidates_against_other_sessions() {
        let store = InMemoryStore::new();
        let cancel = CancellationToken::new();
        let product = Product::new("Lamp", 10.0);
        let first = store.begin().await.unwrap();
        let second = store.begin().await.unwrap();

        first
            .insert(std::slice::from_ref(&product), &cancel)
            .await
            .unwrap();
        second
            .insert(std::slice::from_ref(&product), &cancel)
            .await
            .unwrap();

        first.commit().await.unwrap();
        let result = second.commit().await;

        assert!(matches!(result, Err(StoreError::AlreadyExists { .. })));
        assert_eq!(store.committed_rows::<Product>().await.unwrap().len(), 1);
        first.close().await.unwrap();
        second.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_commit_applies_nothing() {
        let store = InMemoryStore::new();
        let cancel = CancellationToken::new();
        let existing = Product::new("Desk", 90.0);
        let session = store.begin().await.unwrap();

        session
            .insert(&[Product::new("Lamp", 10.0)], &cancel)
            .await
            .unwrap();
        session
            .insert(std::slice::from_ref(&existing), &cancel)
            .await
            .unwrap();
        // Another writer commits the same id first.
        store.seed(&[existing]).await.unwrap();

        assert!(session.commit().await.is_err());
        assert_eq!(store.committed_rows::<Product>().await.unwrap().len(), 1);
        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_update_and_remove_missing_rows_fail() {
        let store = InMemoryStore::new();
        let cancel = CancellationToken::new();
        let session = store.begin().await.unwrap();
        let product = Product::new("Lamp", 10.0);

        let update = session.update(std::slice::from_ref(&product), &cancel).await;
        let remove = session.remove::<Product>(&[product.id], &cancel).await;

        assert!(matches!(update, Err(StoreError::NotFound { .. })));
        assert!(matches!(remove, Err(StoreError::NotFound { .. })));
        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_find_and_query_through_staged_overlay() {
        let store = InMemoryStore::new();
        let cancel = CancellationToken::new();
        let mut lamp = Product::new("Lamp", 10.0);
        store.seed(std::slice::from_ref(&lamp)).await.unwrap();

        let session = store.begin().await.unwrap();
        lamp.price = 12.5;
        session
            .update(std::slice::from_ref(&lamp), &cancel)
            .await
            .unwrap();

        let found: Product = session
            .find(&lamp.id, &Includes::None, &cancel)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.price, 12.5);

        let query = query_all().matching(Criteria::predicate(|p: &Product| p.price > 11.0));
        let rows = session.query(&query, &cancel).await.unwrap();
        assert_eq!(rows.total, 1);

        session.remove::<Product>(&[lamp.id], &cancel).await.unwrap();
        assert!(session
            .find::<Product>(&lamp.id, &Includes::None, &cancel)
            .await
            .unwrap()
            .is_none());
        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_cancelled_token_fails_fast() {
        let store = InMemoryStore::new();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let session = store.begin().await.unwrap();

        let result = session.load_all::<Product>(&cancel).await;

        assert_eq!(result.unwrap_err(), StoreError::Cancelled);
        assert_eq!(store.stats().full_loads, 0);
        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_stats_track_session_lifecycle() {
        let store = InMemoryStore::new();
        let cancel = CancellationToken::new();

        let session = store.begin().await.unwrap();
        session.load_all::<Product>(&cancel).await.unwrap();
        assert_eq!(store.stats().sessions_active, 1);

        session.close().await.unwrap();

        assert_eq!(
            store.stats(),
            StoreStats {
                sessions_opened: 1,
                sessions_active: 0,
                full_loads: 1,
                commits: 0,
                rollbacks: 0,
            }
        );
    }
}
