//! Health and key-space diagnostics.
//!
//! Framework-agnostic report builders meant to back an operator-facing
//! health or stats route in whatever HTTP framework hosts the service.
//! Both reports are serde-serializable and never propagate store errors:
//! an unreachable store reads as `unhealthy` / `None`, not as a failed
//! request.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::query::QUERY_PREFIX;
use crate::store::CacheStore;

/// Liveness report for the cache store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(with = "rfc3339_millis")]
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

/// Counts of stored keys by namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySpaceStats {
    pub cache_keys: usize,
    pub query_keys: usize,
    pub total_keys: usize,
}

/// Diagnostic entry points over a [`CacheStore`].
#[derive(Clone)]
pub struct CacheDiagnostics<St> {
    store: St,
}

impl<St> CacheDiagnostics<St>
where
    St: CacheStore,
{
    pub fn new(store: St) -> Self {
        Self { store }
    }

    /// Pings the store and reports `healthy` or `unhealthy`.
    pub async fn health(&self) -> HealthReport {
        let (status, error) = match self.store.ping().await {
            Ok(()) => (HealthStatus::Healthy, None),
            Err(err) => (HealthStatus::Unhealthy, Some(err.to_string())),
        };

        HealthReport {
            status,
            error,
            timestamp: Utc::now(),
        }
    }

    /// Counts response-cache and query-cache keys currently stored.
    ///
    /// Returns `None` when the store cannot be scanned. The `cache:` count
    /// includes tag sets, which live in the same namespace.
    pub async fn stats(&self) -> Option<KeySpaceStats> {
        let cache_keys = self.scan("cache:*").await?;
        let query_keys = self.scan(&format!("{QUERY_PREFIX}*")).await?;

        Some(KeySpaceStats {
            cache_keys,
            query_keys,
            total_keys: cache_keys + query_keys,
        })
    }

    async fn scan(&self, pattern: &str) -> Option<usize> {
        match self.store.keys(pattern).await {
            Ok(keys) => Some(keys.len()),
            Err(err) => {
                tracing::warn!(pattern, error = %err, "key-space scan failed");
                None
            }
        }
    }
}

mod rfc3339_millis {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        time: &DateTime<Utc>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        DateTime::deserialize(deserializer)
    }
}
