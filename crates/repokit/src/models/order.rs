use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use repokit_core::entity::{Entity, HasCreatedAudit, HasSoftDelete, HasTenant, HasUpdatedAudit};
use repokit_core::entity_capabilities;
use repokit_core::query::Includes;

/// Relation name of [`Order::lines`].
pub const LINES: &str = "lines";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product_id: Uuid,
    pub quantity: u32,
    pub unit_price: f64,
}

/// A customer order with its lines as a loadable relation. Not cached.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub number: String,
    pub customer: String,
    pub lines: Vec<OrderLine>,
    pub is_deleted: bool,
    pub tenant_id: Option<Uuid>,
    pub created_at: Option<DateTime<Utc>>,
    pub created_by: Option<Uuid>,
    pub updated_at: Option<DateTime<Utc>>,
    pub updated_by: Option<Uuid>,
}

impl Order {
    pub fn new(number: impl Into<String>, customer: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            number: number.into(),
            customer: customer.into(),
            ..Self::default()
        }
    }

    pub fn with_tenant(mut self, tenant_id: Uuid) -> Self {
        self.tenant_id = Some(tenant_id);
        self
    }

    pub fn with_line(mut self, product_id: Uuid, quantity: u32, unit_price: f64) -> Self {
        self.lines.push(OrderLine {
            product_id,
            quantity,
            unit_price,
        });
        self
    }

    pub fn total(&self) -> f64 {
        self.lines
            .iter()
            .map(|line| f64::from(line.quantity) * line.unit_price)
            .sum()
    }
}

impl HasSoftDelete for Order {
    fn is_deleted(&self) -> bool {
        self.is_deleted
    }

    fn set_deleted(&mut self, deleted: bool) {
        self.is_deleted = deleted;
    }
}

impl HasTenant for Order {
    fn tenant_id(&self) -> Option<Uuid> {
        self.tenant_id
    }

    fn set_tenant_id(&mut self, tenant_id: Option<Uuid>) {
        self.tenant_id = tenant_id;
    }
}

impl HasCreatedAudit for Order {
    fn set_created(&mut self, at: DateTime<Utc>, by: Option<Uuid>) {
        self.created_at = Some(at);
        self.created_by = by;
    }
}

impl HasUpdatedAudit for Order {
    fn set_updated(&mut self, at: DateTime<Utc>, by: Option<Uuid>) {
        self.updated_at = Some(at);
        self.updated_by = by;
    }
}

impl Entity for Order {
    type Id = Uuid;
    const NAME: &'static str = "Order";

    fn id(&self) -> &Uuid {
        &self.id
    }

    fn set_id(&mut self, id: Uuid) {
        self.id = id;
    }

    fn retain_relations(&mut self, includes: &Includes) {
        if !includes.keeps(LINES) {
            self.lines.clear();
        }
    }

    fn keep_unloaded_relations(&mut self, stored: &Self, includes: &Includes) {
        if !includes.keeps(LINES) {
            self.lines.clone_from(&stored.lines);
        }
    }

    entity_capabilities!(soft_delete, tenant, created_audit, updated_audit);
}
