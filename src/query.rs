//! Typed side cache for expensive query results.
//!
//! Route handlers use this to memoize computed values (aggregations,
//! denormalized lists) independently of whole-response caching. Entries
//! live under the `query:` namespace so diagnostics can count them apart
//! from response entries.
//!
//! Every store failure is recovered locally: a failed read is a miss, a
//! failed write is skipped. The caller's data path never depends on the
//! cache being up.

use std::future::Future;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::DEFAULT_TTL;
use crate::store::CacheStore;

/// Prefix applied to every query-cache key in the store.
pub const QUERY_PREFIX: &str = "query:";

/// Typed get/set cache over the `query:` namespace.
///
/// Cheap to clone; clones share the underlying store.
#[derive(Clone)]
pub struct QueryCache<St> {
    store: St,
    default_ttl: Duration,
}

impl<St> QueryCache<St>
where
    St: CacheStore,
{
    pub fn new(store: St) -> Self {
        Self {
            store,
            default_ttl: DEFAULT_TTL,
        }
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Fetches and deserializes the value stored under `key`.
    ///
    /// Returns `None` on a miss, an expired entry, a store failure, or a
    /// payload that no longer deserializes as `T`.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let prefixed = prefixed(key);
        let bytes = match self.store.get(&prefixed).await {
            Ok(bytes) => bytes?,
            Err(err) => {
                tracing::warn!(key = %prefixed, error = %err, "query cache read failed");
                return None;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(key = %prefixed, error = %err, "stale query cache payload shape");
                None
            }
        }
    }

    /// Stores `value` under `key` with the default TTL.
    pub async fn set<T: Serialize>(&self, key: &str, value: &T) {
        self.set_with_ttl(key, value, self.default_ttl).await;
    }

    /// Stores `value` under `key` with an explicit TTL.
    pub async fn set_with_ttl<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let prefixed = prefixed(key);
        let bytes = match serde_json::to_vec(value) {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::warn!(key = %prefixed, error = %err, "query cache serialization failed");
                return;
            }
        };

        if let Err(err) = self.store.set_ex(&prefixed, bytes, ttl).await {
            tracing::warn!(key = %prefixed, error = %err, "query cache write failed");
        }
    }

    /// Removes the value stored under `key`, if any.
    pub async fn del(&self, key: &str) {
        let prefixed = prefixed(key);
        if let Err(err) = self.store.del(&[prefixed.clone()]).await {
            tracing::warn!(key = %prefixed, error = %err, "query cache delete failed");
        }
    }

    /// Removes every query entry matching `pattern` (store glob dialect).
    /// Returns how many entries were removed.
    pub async fn clear(&self, pattern: &str) -> u64 {
        let prefixed = prefixed(pattern);
        let keys = match self.store.keys(&prefixed).await {
            Ok(keys) => keys,
            Err(err) => {
                tracing::warn!(pattern = %prefixed, error = %err, "query cache scan failed");
                return 0;
            }
        };

        if keys.is_empty() {
            return 0;
        }

        match self.store.del(&keys).await {
            Ok(removed) => removed,
            Err(err) => {
                tracing::warn!(pattern = %prefixed, error = %err, "query cache clear failed");
                0
            }
        }
    }

    /// Populates the cache by running `fetcher` and storing its result.
    ///
    /// The fetched value is returned either way; a fetcher error propagates
    /// while a cache write error does not.
    pub async fn warm<T, E, F, Fut>(&self, key: &str, ttl: Duration, fetcher: F) -> Result<T, E>
    where
        T: Serialize,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let value = fetcher().await?;
        self.set_with_ttl(key, &value, ttl).await;
        Ok(value)
    }
}

fn prefixed(key: &str) -> String {
    format!("{QUERY_PREFIX}{key}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::InMemoryStore;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct ProductCount {
        category: String,
        count: u32,
    }

    #[tokio::test]
    async fn set_then_get_round_trips_typed_values() {
        let cache = QueryCache::new(InMemoryStore::new());
        let value = ProductCount {
            category: "cat1".to_owned(),
            count: 12,
        };

        cache.set("products:count:cat1", &value).await;
        let read: Option<ProductCount> = cache.get("products:count:cat1").await;
        assert_eq!(read, Some(value));
    }

    #[tokio::test]
    async fn get_misses_on_absent_or_deleted_keys() {
        let cache = QueryCache::new(InMemoryStore::new());
        assert_eq!(cache.get::<ProductCount>("absent").await, None);

        cache.set("k", &1_u32).await;
        cache.del("k").await;
        assert_eq!(cache.get::<u32>("k").await, None);
    }

    #[tokio::test]
    async fn clear_removes_only_matching_query_keys() {
        let store = InMemoryStore::new();
        let cache = QueryCache::new(store.clone());
        cache.set("products:list", &1_u32).await;
        cache.set("products:featured", &2_u32).await;
        cache.set("categories:list", &3_u32).await;

        assert_eq!(cache.clear("products:*").await, 2);
        assert_eq!(cache.get::<u32>("products:list").await, None);
        assert_eq!(cache.get::<u32>("categories:list").await, Some(3));
    }

    #[tokio::test]
    async fn warm_stores_the_fetched_value() {
        let cache = QueryCache::new(InMemoryStore::new());

        let value: Result<u32, std::convert::Infallible> = cache
            .warm("warmed", Duration::from_secs(60), || async { Ok(41 + 1) })
            .await;
        assert_eq!(value.expect("fetcher succeeds"), 42);
        assert_eq!(cache.get::<u32>("warmed").await, Some(42));
    }

    #[tokio::test]
    async fn warm_propagates_fetcher_errors_without_caching() {
        let cache = QueryCache::new(InMemoryStore::new());

        let result: Result<u32, &str> = cache
            .warm("failed", Duration::from_secs(60), || async { Err("boom") })
            .await;
        assert_eq!(result, Err("boom"));
        assert_eq!(cache.get::<u32>("failed").await, None);
    }
}
