//! Classification of Redis failures.
//!
//! Refused, dropped and timed-out connections become `ConnectionFailed`;
//! anything Redis answered with becomes `OperationFailed`. Repository reads
//! surface both as `CacheUnavailable`.

use repokit_core::cache::CacheError;

/// Maps a Redis error onto the cache error taxonomy.
pub fn map_redis_error(err: redis::RedisError) -> CacheError {
    if err.is_connection_refusal() || err.is_timeout() || err.is_connection_dropped() {
        CacheError::ConnectionFailed(err.to_string())
    } else {
        CacheError::OperationFailed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refused_connection_is_connection_failure() {
        let refused = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");

        let error = map_redis_error(redis::RedisError::from(refused));

        assert!(matches!(error, CacheError::ConnectionFailed(_)));
    }

    #[test]
    fn test_server_error_is_operation_failure() {
        let wrong_type = redis::RedisError::from((redis::ErrorKind::TypeError, "WRONGTYPE"));

        let error = map_redis_error(wrong_type);

        assert!(matches!(error, CacheError::OperationFailed(_)));
    }
}
