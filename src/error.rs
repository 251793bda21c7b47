use thiserror::Error;

/// Errors that can occur while interacting with a cache store.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("store error: {0}")]
    Store(String),

    #[error("codec error: {0}")]
    Codec(String),

    #[cfg(feature = "redis-backend")]
    #[error(transparent)]
    Redis(#[from] redis::RedisError),
}
