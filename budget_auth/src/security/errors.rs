//! Error types for security module

use thiserror::Error;

/// Result type for rate limiting operations
pub type RateLimiterResult<T> = Result<T, RateLimitError>;

/// Rate limiting errors
#[derive(Debug, Error)]
pub enum RateLimitError {
    /// Counter store unreachable or returned an unexpected reply
    #[error("Counter store error: {0}")]
    Store(String),
}

impl From<redis::RedisError> for RateLimitError {
    fn from(err: redis::RedisError) -> Self {
        RateLimitError::Store(err.to_string())
    }
}

impl From<RateLimitError> for crate::auth::AuthError {
    fn from(err: RateLimitError) -> Self {
        crate::auth::AuthError::Storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthError, errors::ErrorKind};

    #[test]
    fn test_store_failure_is_internal() {
        let err: AuthError = RateLimitError::Store("connection reset".to_string()).into();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(err.client_message(), "Internal server error");
    }

    #[test]
    fn test_redis_error_conversion() {
        let redis_err = redis::RedisError::from((redis::ErrorKind::IoError, "broken pipe"));
        let err = RateLimitError::from(redis_err);
        assert!(matches!(err, RateLimitError::Store(msg) if msg.contains("broken pipe")));
    }
}
