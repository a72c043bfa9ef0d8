use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use repokit_core::entity::{
    Entity, HasActiveStatus, HasCache, HasCreatedAudit, HasSoftDelete, HasTenant,
    HasUpdatedAudit,
};
use repokit_core::entity_capabilities;

/// Snapshot expiry of the product catalogue.
const CACHE_TTL: Duration = Duration::from_secs(300);

/// A catalogue item. Declares every capability and is cached as a whole collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub price: f64,
    pub is_active: bool,
    pub is_deleted: bool,
    pub tenant_id: Option<Uuid>,
    pub created_at: Option<DateTime<Utc>>,
    pub created_by: Option<Uuid>,
    pub updated_at: Option<DateTime<Utc>>,
    pub updated_by: Option<Uuid>,
}

impl Product {
    /// Creates an unsaved, inactive product with a fresh id.
    pub fn new(name: impl Into<String>, price: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            price,
            ..Self::default()
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_tenant(mut self, tenant_id: Uuid) -> Self {
        self.tenant_id = Some(tenant_id);
        self
    }

    /// Marks the product active without going through an insert.
    pub fn active(mut self) -> Self {
        self.is_active = true;
        self
    }
}

impl HasSoftDelete for Product {
    fn is_deleted(&self) -> bool {
        self.is_deleted
    }

    fn set_deleted(&mut self, deleted: bool) {
        self.is_deleted = deleted;
    }
}

impl HasActiveStatus for Product {
    fn is_active(&self) -> bool {
        self.is_active
    }

    fn set_active(&mut self, active: bool) {
        self.is_active = active;
    }
}

impl HasTenant for Product {
    fn tenant_id(&self) -> Option<Uuid> {
        self.tenant_id
    }

    fn set_tenant_id(&mut self, tenant_id: Option<Uuid>) {
        self.tenant_id = tenant_id;
    }
}

impl HasCreatedAudit for Product {
    fn set_created(&mut self, at: DateTime<Utc>, by: Option<Uuid>) {
        self.created_at = Some(at);
        self.created_by = by;
    }
}

impl HasUpdatedAudit for Product {
    fn set_updated(&mut self, at: DateTime<Utc>, by: Option<Uuid>) {
        self.updated_at = Some(at);
        self.updated_by = by;
    }
}

impl HasCache for Product {
    fn cache_key(&self) -> String {
        "repokit:products".to_string()
    }

    fn cache_ttl(&self) -> Option<Duration> {
        Some(CACHE_TTL)
    }
}

impl Entity for Product {
    type Id = Uuid;
    const NAME: &'static str = "Product";

    fn id(&self) -> &Uuid {
        &self.id
    }

    fn set_id(&mut self, id: Uuid) {
        self.id = id;
    }

    entity_capabilities!(
        soft_delete,
        active_status,
        tenant,
        created_audit,
        updated_audit,
        cache
    );
}
