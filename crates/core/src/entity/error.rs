use thiserror::Error;

/// Errors raised while resolving the capabilities of an entity type.
///
/// Resolution happens once, when a repository is built, so these are fatal for
/// that repository and never retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CapabilityError {
    #[error("{entity_type} is cacheable but its prototype has an empty cache key")]
    EmptyCacheKey { entity_type: &'static str },
    #[error("{entity_type} is cacheable but its prototype has a zero cache expiry")]
    ZeroCacheTtl { entity_type: &'static str },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_cache_key_display() {
        let error = CapabilityError::EmptyCacheKey {
            entity_type: "Product",
        };
        assert_eq!(
            error.to_string(),
            "Product is cacheable but its prototype has an empty cache key"
        );
    }

    #[test]
    fn test_zero_cache_ttl_display() {
        let error = CapabilityError::ZeroCacheTtl {
            entity_type: "Product",
        };
        assert_eq!(
            error.to_string(),
            "Product is cacheable but its prototype has a zero cache expiry"
        );
    }
}
