use thiserror::Error;

/// Failure reading or writing an entity snapshot.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// The backend could not be reached.
    #[error("Cache connection failed: {0}")]
    ConnectionFailed(String),
    /// The backend answered with an error, or a snapshot is still missing after a rebuild.
    #[error("Cache operation failed: {0}")]
    OperationFailed(String),
    /// A snapshot could not be encoded.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result of a [`Cache`](super::Cache) call.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_failed_display() {
        let error = CacheError::ConnectionFailed("timeout".to_string());
        assert_eq!(error.to_string(), "Cache connection failed: timeout");
    }

    #[test]
    fn test_operation_failed_display() {
        let error = CacheError::OperationFailed("read only replica".to_string());
        assert_eq!(
            error.to_string(),
            "Cache operation failed: read only replica"
        );
    }

    #[test]
    fn test_serialization_display() {
        let error = CacheError::Serialization("invalid JSON".to_string());
        assert_eq!(error.to_string(), "Serialization error: invalid JSON");
    }
}
