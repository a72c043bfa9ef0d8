use std::time::Duration;

use super::{CapabilityError, Entity, HasCache};

/// Where and for how long the snapshot of a cacheable entity type lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    pub key: String,
    pub ttl: Option<Duration>,
}

/// Capabilities of one entity type, resolved once per repository.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub soft_delete: bool,
    pub active_status: bool,
    pub multi_tenant: bool,
    pub created_audit: bool,
    pub updated_audit: bool,
    /// Present only for cacheable types.
    pub cache: Option<CacheSettings>,
}

impl Capabilities {
    /// Probes a default instance of `E` for each capability.
    ///
    /// Cacheable types must report a non-blank key and a non-zero expiry,
    /// since every later read depends on them.
    pub fn resolve<E: Entity>() -> Result<Self, CapabilityError> {
        let mut prototype = E::default();

        let cache = prototype
            .cache()
            .map(|cache| cache_settings::<E>(cache))
            .transpose()?;

        Ok(Self {
            soft_delete: prototype.soft_delete().is_some(),
            active_status: prototype.active_status().is_some(),
            multi_tenant: prototype.tenant().is_some(),
            created_audit: prototype.created_audit_mut().is_some(),
            updated_audit: prototype.updated_audit_mut().is_some(),
            cache,
        })
    }

    pub fn is_cacheable(&self) -> bool {
        self.cache.is_some()
    }
}

fn cache_settings<E: Entity>(cache: &dyn HasCache) -> Result<CacheSettings, CapabilityError> {
    let key = cache.cache_key();
    if key.trim().is_empty() {
        return Err(CapabilityError::EmptyCacheKey {
            entity_type: E::NAME,
        });
    }

    let ttl = cache.cache_ttl();
    if ttl.is_some_and(|ttl| ttl.is_zero()) {
        return Err(CapabilityError::ZeroCacheTtl {
            entity_type: E::NAME,
        });
    }

    Ok(CacheSettings { key, ttl })
}
