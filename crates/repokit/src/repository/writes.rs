use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use repokit_core::entity::{Entity, EntityId};
use repokit_core::query::Includes;
use repokit_core::storage::{Session, Store, StoreError};

use super::scope::finish;
use super::{GenericRepository, RepositoryError, Result, UnitOfWork};

/// One write call, applied inside a session.
enum Mutation<E: Entity> {
    Insert(Vec<E>),
    Update(Vec<E>, Includes),
    Delete(Vec<E::Id>),
}

impl<E: Entity> Mutation<E> {
    fn action(&self) -> &'static str {
        match self {
            Self::Insert(_) => "insert",
            Self::Update(..) => "update",
            Self::Delete(_) => "delete",
        }
    }

    fn len(&self) -> usize {
        match self {
            Self::Insert(rows) | Self::Update(rows, _) => rows.len(),
            Self::Delete(ids) => ids.len(),
        }
    }
}

impl<E: Entity, S: Store> GenericRepository<E, S> {
    /// Creates a row and returns it with its id, audit fields and tenant filled in.
    pub async fn insert_one(
        &self,
        entity: E,
        uow: Option<&UnitOfWork<S>>,
        cancel: &CancellationToken,
    ) -> Result<E> {
        let written = self.insert_many(vec![entity], uow, cancel).await?;
        only(written)
    }

    /// Creates rows in one session.
    ///
    /// Unassigned ids are generated, created and updated audit fields are
    /// stamped and active-status rows are activated. Callers scoped to a
    /// tenant always write into that tenant; callers ignoring tenancy keep the
    /// row's own tenant.
    pub async fn insert_many(
        &self,
        entities: Vec<E>,
        uow: Option<&UnitOfWork<S>>,
        cancel: &CancellationToken,
    ) -> Result<Vec<E>> {
        self.mutate(Mutation::Insert(entities), uow, cancel).await
    }

    /// Replaces a stored row with `entity`. See [`update_many`](Self::update_many).
    pub async fn update_one(
        &self,
        entity: E,
        includes: &Includes,
        uow: Option<&UnitOfWork<S>>,
        cancel: &CancellationToken,
    ) -> Result<E> {
        let written = self.update_many(vec![entity], includes, uow, cancel).await?;
        only(written)
    }

    /// Replaces stored rows with the given values.
    ///
    /// Each row is loaded by id, then every field is overwritten from the
    /// caller's value, defaults included. Callers must therefore pass complete
    /// entities. Relations named in `includes` are replaced as well; the others
    /// keep their stored value. The row stays in the caller's tenant and gets a
    /// fresh updated stamp. Rows that do not exist or belong to another tenant
    /// fail with `NotFound`.
    pub async fn update_many(
        &self,
        entities: Vec<E>,
        includes: &Includes,
        uow: Option<&UnitOfWork<S>>,
        cancel: &CancellationToken,
    ) -> Result<Vec<E>> {
        self.mutate(Mutation::Update(entities, includes.clone()), uow, cancel)
            .await
    }

    pub async fn delete_one(
        &self,
        id: &E::Id,
        uow: Option<&UnitOfWork<S>>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        self.delete_many(std::slice::from_ref(id), uow, cancel).await
    }

    /// Deletes rows by id. Soft-deletable rows are flagged and kept with their
    /// relations; others are removed. Repeated ids are deleted once.
    pub async fn delete_many(
        &self,
        ids: &[E::Id],
        uow: Option<&UnitOfWork<S>>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let mut seen = BTreeSet::new();
        let ids = ids.iter().filter(|id| seen.insert(*id)).cloned().collect();
        self.mutate(Mutation::Delete(ids), uow, cancel)
            .await
            .map(drop)
    }

    /// Runs a write in the unit of work's session, or in a session of its own.
    ///
    /// With a unit of work the cache rebuild is registered to run after its
    /// commit. Otherwise the session is committed or rolled back, always
    /// closed, and the cache is rebuilt before returning. Once the commit has
    /// succeeded the rebuild no longer observes `cancel`, so a returned write
    /// is always visible to the next cached read.
    async fn mutate(
        &self,
        mutation: Mutation<E>,
        uow: Option<&UnitOfWork<S>>,
        cancel: &CancellationToken,
    ) -> Result<Vec<E>> {
        if cancel.is_cancelled() {
            return Err(RepositoryError::Cancelled);
        }
        let (action, count) = (mutation.action(), mutation.len());

        let written = match uow {
            Some(uow) => {
                let written = self.apply(uow.session(), mutation, cancel).await?;
                if let Some(cache) = &self.cache {
                    uow.after_commit(cache.rebuild_after_commit(Arc::clone(&self.store)));
                }
                written
            }
            None => {
                let session = self.store.begin().await?;
                let outcome = self.apply(&session, mutation, cancel).await;
                let written = finish(session, outcome).await?;
                if let Some(cache) = &self.cache {
                    cache
                        .rebuild(self.store.as_ref(), &CancellationToken::new())
                        .await?;
                }
                written
            }
        };

        tracing::debug!(
            entity = E::NAME,
            action,
            count,
            deferred = uow.is_some(),
            "Write completed"
        );
        Ok(written)
    }

    async fn apply(
        &self,
        session: &S::Session,
        mutation: Mutation<E>,
        cancel: &CancellationToken,
    ) -> Result<Vec<E>> {
        let now = Utc::now();
        let actor = self.context.actor_id();

        match mutation {
            Mutation::Insert(mut entities) => {
                for entity in &mut entities {
                    self.prepare_insert(entity, now, actor).await;
                }
                session.insert(&entities, cancel).await?;
                Ok(entities)
            }
            Mutation::Update(entities, includes) => {
                let mut replaced = Vec::with_capacity(entities.len());
                for incoming in &entities {
                    let stored = self.load_owned(session, incoming.id(), cancel).await?;
                    let tenant = stored.tenant().and_then(|t| t.tenant_id());

                    let mut current = stored.clone();
                    current.overwrite_from(incoming);
                    current.keep_unloaded_relations(&stored, &includes);
                    if self.scoped_to_tenant() {
                        if let Some(owned) = current.tenant_mut() {
                            owned.set_tenant_id(tenant);
                        }
                    }
                    stamp_updated(&mut current, now, actor);
                    replaced.push(current);
                }
                session.update(&replaced, cancel).await?;
                Ok(replaced)
            }
            Mutation::Delete(ids) => {
                let mut flagged = Vec::new();
                let mut removed = Vec::new();
                for id in ids {
                    let mut current = self.load_owned(session, &id, cancel).await?;
                    let soft = match current.soft_delete_mut() {
                        Some(state) => {
                            state.set_deleted(true);
                            true
                        }
                        None => false,
                    };
                    if soft {
                        stamp_updated(&mut current, now, actor);
                        flagged.push(current);
                    } else {
                        removed.push(id);
                    }
                }
                if !flagged.is_empty() {
                    session.update(&flagged, cancel).await?;
                }
                if !removed.is_empty() {
                    session.remove::<E>(&removed, cancel).await?;
                }
                Ok(flagged)
            }
        }
    }

    async fn prepare_insert(&self, entity: &mut E, now: DateTime<Utc>, actor: Option<Uuid>) {
        if entity.id().is_unassigned() {
            entity.set_id(<E::Id as EntityId>::generate());
        }
        if let Some(audit) = entity.created_audit_mut() {
            audit.set_created(now, actor);
        }
        stamp_updated(entity, now, actor);
        if self.scoped_to_tenant() {
            if let Some(tenant) = entity.tenant_mut() {
                tenant.set_tenant_id(self.context.tenant.tenant_id);
            }
        }
        if let Some(status) = entity.active_status_mut() {
            status.activate().await;
        }
    }

    /// Loads a whole row, relations included, for writing. Rows of other
    /// tenants count as missing.
    async fn load_owned(
        &self,
        session: &S::Session,
        id: &E::Id,
        cancel: &CancellationToken,
    ) -> Result<E> {
        let scope = self.write_scope();
        session
            .find::<E>(id, &Includes::All, cancel)
            .await?
            .filter(|row| scope.admits_tenant(row))
            .ok_or_else(|| RepositoryError::not_found::<E>(id))
    }

    fn scoped_to_tenant(&self) -> bool {
        self.capabilities.multi_tenant && !self.context.tenant.ignore_tenancy
    }
}

fn stamp_updated<E: Entity>(entity: &mut E, now: DateTime<Utc>, actor: Option<Uuid>) {
    if let Some(audit) = entity.updated_audit_mut() {
        audit.set_updated(now, actor);
    }
}

fn only<E: Entity>(written: Vec<E>) -> Result<E> {
    written.into_iter().next().ok_or_else(|| {
        RepositoryError::Persistence(StoreError::InvalidData(format!(
            "{} write returned no row",
            E::NAME
        )))
    })
}
