use thiserror::Error;

use repokit_core::cache::CacheError;
use repokit_core::entity::CapabilityError;
use repokit_core::query::QueryError;
use repokit_core::storage::StoreError;

/// Errors surfaced by [`GenericRepository`](super::GenericRepository) and
/// [`UnitOfWork`](super::UnitOfWork).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RepositoryError {
    #[error("Invalid configuration: {0}")]
    Configuration(String),
    #[error("{entity_type} not found: {key}")]
    NotFound { entity_type: &'static str, key: String },
    #[error("Expected one {entity_type} but found {count}")]
    MultipleResults { entity_type: &'static str, count: usize },
    #[error("Capability resolution failed: {0}")]
    CapabilityResolution(#[from] CapabilityError),
    #[error("Invalid query: {0}")]
    InvalidQuery(QueryError),
    #[error("Persistence failed: {0}")]
    Persistence(StoreError),
    #[error("Cache unavailable: {0}")]
    CacheUnavailable(#[from] CacheError),
    #[error("Operation cancelled")]
    Cancelled,
    #[error("After-commit action failed: {0}")]
    PostCommit(Box<RepositoryError>),
}

impl RepositoryError {
    pub(crate) fn not_found<E: repokit_core::entity::Entity>(id: &E::Id) -> Self {
        Self::NotFound {
            entity_type: E::NAME,
            key: id.to_string(),
        }
    }
}

impl From<StoreError> for RepositoryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Cancelled => Self::Cancelled,
            StoreError::NotFound { entity_type, id } => Self::NotFound {
                entity_type,
                key: id,
            },
            other => Self::Persistence(other),
        }
    }
}

impl From<QueryError> for RepositoryError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::InvalidPageSize => Self::Configuration(err.to_string()),
            other => Self::InvalidQuery(other),
        }
    }
}

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, RepositoryError>;
