//! Storage adapters for the cache layer.
//!
//! All cache state lives behind the [`CacheStore`] trait: six key-value
//! operations (get, set-with-expiry, delete, pattern scan, set add, set
//! members) plus a ping for health checks. This module ships with:
//! - [`memory::InMemoryStore`] — a process-local store backed by [`dashmap`],
//!   also the substitute used in tests.
//! - `redis::RedisStore` *(optional)* — a distributed store when the
//!   `redis-backend` crate feature is enabled.
//!
//! The layer never assumes anything beyond these operations; any key-value
//! store with expiry and set semantics satisfies the contract.

pub mod memory;
#[cfg(feature = "redis-backend")]
pub mod redis;

use async_trait::async_trait;
use std::time::Duration;

use crate::error::CacheError;

/// Key-value store contract required by the cache layer.
///
/// Implementations must be cheap to clone; clones share the underlying
/// connection or map.
#[async_trait]
pub trait CacheStore: Send + Sync + Clone + 'static {
    /// Fetches the raw value stored under `key`.
    ///
    /// Returns `Ok(None)` when the key is absent or its entry has expired.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Stores `value` under `key`, expiring after `ttl`.
    async fn set_ex(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError>;

    /// Deletes the given keys, returning how many existed.
    ///
    /// Deleting an absent key is a no-op, not an error.
    async fn del(&self, keys: &[String]) -> Result<u64, CacheError>;

    /// Lists every key matching `pattern`.
    ///
    /// The pattern syntax is the store's native glob dialect (for Redis:
    /// `*`, `?`, `[...]` as understood by `KEYS`). Patterns are passed
    /// through verbatim; callers are responsible for any escaping.
    async fn keys(&self, pattern: &str) -> Result<Vec<String>, CacheError>;

    /// Adds `member` to the set stored under `set`, creating it if absent.
    async fn sadd(&self, set: &str, member: &str) -> Result<(), CacheError>;

    /// Returns all members of the set stored under `set`.
    ///
    /// An absent set reads as empty.
    async fn smembers(&self, set: &str) -> Result<Vec<String>, CacheError>;

    /// Round-trips a liveness probe to the store.
    async fn ping(&self) -> Result<(), CacheError>;
}
