use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Counter {key} holds a non-numeric value: {details}")]
    InvalidCounter { key: String, details: String },
}

pub type CacheResult<T> = Result<T, CacheError>;
