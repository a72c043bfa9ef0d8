//! Ambient request values: tenant scope and the acting identity.
//!
//! These are plain values handed to a repository when it is built or scoped to
//! a request, never process-wide state.

use std::sync::Arc;

use uuid::Uuid;

/// Tenant scope of the current caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TenantContext {
    pub tenant_id: Option<Uuid>,
    /// When set, multi-tenant entities are read and written across tenants.
    pub ignore_tenancy: bool,
}

impl TenantContext {
    /// Scopes the caller to one tenant.
    pub fn tenant(tenant_id: Uuid) -> Self {
        Self {
            tenant_id: Some(tenant_id),
            ignore_tenancy: false,
        }
    }

    /// Lets the caller see every tenant.
    pub fn ignoring_tenancy() -> Self {
        Self {
            tenant_id: None,
            ignore_tenancy: true,
        }
    }
}

/// Resolves the actor recorded in audit fields.
pub trait IdentityProvider: Send + Sync {
    fn current_actor_id(&self) -> Option<Uuid>;
}

/// Identity provider returning a fixed actor (or none).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FixedIdentity(pub Option<Uuid>);

impl IdentityProvider for FixedIdentity {
    fn current_actor_id(&self) -> Option<Uuid> {
        self.0
    }
}

/// Everything a repository needs to know about the caller.
#[derive(Clone)]
pub struct RequestContext {
    pub tenant: TenantContext,
    pub identity: Arc<dyn IdentityProvider>,
}

impl RequestContext {
    pub fn new(tenant: TenantContext, identity: Arc<dyn IdentityProvider>) -> Self {
        Self { tenant, identity }
    }

    /// Context of a caller in `tenant_id` acting as `actor_id`.
    pub fn for_actor(tenant_id: Uuid, actor_id: Uuid) -> Self {
        Self::new(
            TenantContext::tenant(tenant_id),
            Arc::new(FixedIdentity(Some(actor_id))),
        )
    }

    /// Anonymous caller that sees every tenant. Meant for system jobs and tests.
    pub fn system() -> Self {
        Self::new(
            TenantContext::ignoring_tenancy(),
            Arc::new(FixedIdentity::default()),
        )
    }

    pub fn actor_id(&self) -> Option<Uuid> {
        self.identity.current_actor_id()
    }
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("tenant", &self.tenant)
            .field("actor_id", &self.actor_id())
            .finish()
    }
}
