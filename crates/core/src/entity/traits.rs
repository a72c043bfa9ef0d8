use std::fmt::{Debug, Display};
use std::hash::Hash;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use uuid::Uuid;

use crate::query::Includes;

/// Identifier of an entity.
pub trait EntityId:
    Clone + Eq + Ord + Hash + Debug + Display + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Returns true when no identifier has been assigned yet.
    fn is_unassigned(&self) -> bool;

    /// Generates a fresh identifier.
    fn generate() -> Self;
}

impl EntityId for Uuid {
    fn is_unassigned(&self) -> bool {
        self.is_nil()
    }

    fn generate() -> Self {
        Uuid::new_v4()
    }
}

impl EntityId for String {
    fn is_unassigned(&self) -> bool {
        self.trim().is_empty()
    }

    fn generate() -> Self {
        Uuid::new_v4().to_string()
    }
}

/// A record the repository can store.
///
/// Optional behaviour is declared through the capability accessors. Each one
/// defaults to `None`; use [`entity_capabilities!`](crate::entity_capabilities)
/// inside the impl block to opt in, which only compiles when the matching
/// capability trait is implemented.
pub trait Entity:
    Clone + Default + Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    type Id: EntityId;

    /// Type name used in errors, logs and as the table name of in-memory stores.
    const NAME: &'static str;

    fn id(&self) -> &Self::Id;

    fn set_id(&mut self, id: Self::Id);

    fn soft_delete(&self) -> Option<&dyn HasSoftDelete> {
        None
    }

    fn soft_delete_mut(&mut self) -> Option<&mut dyn HasSoftDelete> {
        None
    }

    fn active_status(&self) -> Option<&dyn HasActiveStatus> {
        None
    }

    fn active_status_mut(&mut self) -> Option<&mut dyn HasActiveStatus> {
        None
    }

    fn tenant(&self) -> Option<&dyn HasTenant> {
        None
    }

    fn tenant_mut(&mut self) -> Option<&mut dyn HasTenant> {
        None
    }

    fn created_audit_mut(&mut self) -> Option<&mut dyn HasCreatedAudit> {
        None
    }

    fn updated_audit_mut(&mut self) -> Option<&mut dyn HasUpdatedAudit> {
        None
    }

    fn cache(&self) -> Option<&dyn HasCache> {
        None
    }

    /// Unloads related data that `includes` does not ask for.
    ///
    /// Entities without relations keep the default no-op.
    fn retain_relations(&mut self, _includes: &Includes) {}

    /// Takes the relations `includes` leaves out from `stored`.
    ///
    /// Writes call this after the replace copy, so related data the caller
    /// did not load is written back unchanged.
    fn keep_unloaded_relations(&mut self, _stored: &Self, _includes: &Includes) {}

    /// Overwrites every field of `self` with the value from `source`.
    ///
    /// This is a full replace, not a patch: fields left at their default in
    /// `source` overwrite the stored value with that default.
    fn overwrite_from(&mut self, source: &Self) {
        self.clone_from(source);
    }
}

/// Entities deleted by flag instead of removal.
pub trait HasSoftDelete {
    fn is_deleted(&self) -> bool;

    fn set_deleted(&mut self, deleted: bool);
}

/// Entities with an active flag.
#[async_trait]
pub trait HasActiveStatus: Send {
    fn is_active(&self) -> bool;

    fn set_active(&mut self, active: bool);

    /// Hook run when the entity is created.
    async fn activate(&mut self) {
        self.set_active(true);
    }
}

/// Entities scoped to a tenant.
pub trait HasTenant {
    fn tenant_id(&self) -> Option<Uuid>;

    fn set_tenant_id(&mut self, tenant_id: Option<Uuid>);
}

/// Entities stamped with their creation time and creator.
pub trait HasCreatedAudit {
    fn set_created(&mut self, at: DateTime<Utc>, by: Option<Uuid>);
}

/// Entities stamped with their last update time and updater.
pub trait HasUpdatedAudit {
    fn set_updated(&mut self, at: DateTime<Utc>, by: Option<Uuid>);
}

/// Entities whose whole collection is cached under one key.
pub trait HasCache {
    fn cache_key(&self) -> String;

    /// Expiry of the cached snapshot; `None` keeps it until the next write.
    fn cache_ttl(&self) -> Option<Duration>;
}
