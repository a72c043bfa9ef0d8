//! Entities shared by the unit tests of this crate.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::{
    Entity, HasActiveStatus, HasCache, HasCreatedAudit, HasSoftDelete, HasTenant,
    HasUpdatedAudit,
};

/// Entity with no optional capability.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plain {
    pub id: Uuid,
    pub name: String,
    pub rank: i64,
}

impl Plain {
    pub fn new(name: &str, rank: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            rank,
        }
    }
}

impl Entity for Plain {
    type Id = Uuid;
    const NAME: &'static str = "Plain";

    fn id(&self) -> &Uuid {
        &self.id
    }

    fn set_id(&mut self, id: Uuid) {
        self.id = id;
    }
}

/// Entity declaring every capability.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Widget {
    pub id: Uuid,
    pub name: String,
    pub price: f64,
    pub tags: Vec<String>,
    pub is_active: bool,
    pub is_deleted: bool,
    pub tenant_id: Option<Uuid>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Widget {
    pub fn new(name: &str, price: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            price,
            is_active: true,
            ..Self::default()
        }
    }

    pub fn in_tenant(mut self, tenant_id: Uuid) -> Self {
        self.tenant_id = Some(tenant_id);
        self
    }
}

impl HasSoftDelete for Widget {
    fn is_deleted(&self) -> bool {
        self.is_deleted
    }

    fn set_deleted(&mut self, deleted: bool) {
        self.is_deleted = deleted;
    }
}

impl HasActiveStatus for Widget {
    fn is_active(&self) -> bool {
        self.is_active
    }

    fn set_active(&mut self, active: bool) {
        self.is_active = active;
    }
}

impl HasTenant for Widget {
    fn tenant_id(&self) -> Option<Uuid> {
        self.tenant_id
    }

    fn set_tenant_id(&mut self, tenant_id: Option<Uuid>) {
        self.tenant_id = tenant_id;
    }
}

impl HasCreatedAudit for Widget {
    fn set_created(&mut self, at: DateTime<Utc>, _by: Option<Uuid>) {
        self.created_at = Some(at);
    }
}

impl HasUpdatedAudit for Widget {
    fn set_updated(&mut self, at: DateTime<Utc>, _by: Option<Uuid>) {
        self.updated_at = Some(at);
    }
}

impl HasCache for Widget {
    fn cache_key(&self) -> String {
        "widgets".to_string()
    }

    fn cache_ttl(&self) -> Option<Duration> {
        Some(Duration::from_secs(60))
    }
}

impl Entity for Widget {
    type Id = Uuid;
    const NAME: &'static str = "Widget";

    fn id(&self) -> &Uuid {
        &self.id
    }

    fn set_id(&mut self, id: Uuid) {
        self.id = id;
    }

    crate::entity_capabilities!(
        soft_delete,
        active_status,
        tenant,
        created_audit,
        updated_audit,
        cache
    );
}
