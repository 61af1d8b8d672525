use crate::error::PaymentError;
use thiserror::Error;

pub type CacheResult<T> = Result<T, CacheError>;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Redis connection error: {0}")]
    ConnectionError(String),

    #[error("Redis command failed: {0}")]
    CommandError(#[from] redis::RedisError),

    #[error("Cache value (de)serialization failed: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl From<bb8::RunError<redis::RedisError>> for CacheError {
    fn from(err: bb8::RunError<redis::RedisError>) -> Self {
        match err {
            bb8::RunError::User(e) => CacheError::CommandError(e),
            bb8::RunError::TimedOut => {
                CacheError::ConnectionError("Timed out waiting for a Redis connection".to_string())
            }
        }
    }
}

impl From<CacheError> for PaymentError {
    fn from(err: CacheError) -> Self {
        PaymentError::storage(err.to_string())
    }
}
