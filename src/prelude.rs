//! Re-exports for consumers who prefer a single import.
//!
//! ```no_run
//! use storefront_cache::prelude::*;
//! # use std::time::Duration;
//! let layer = CacheLayer::builder(InMemoryStore::new())
//!     .ttl(Duration::from_secs(300))
//!     .build();
//! ```

pub use crate::admin::{CacheDiagnostics, HealthReport, HealthStatus, KeySpaceStats};
pub use crate::codec::{CacheRecord, JsonCodec, RecordCodec};
pub use crate::config::{CacheConfig, DEFAULT_TTL};
pub use crate::error::CacheError;
pub use crate::invalidate::CacheInvalidator;
pub use crate::key::{KeyGenerator, CACHE_PREFIX, TAG_PREFIX};
pub use crate::layer::{CacheLayer, CacheLayerBuilder, CacheService, X_CACHE, X_CACHE_TIMESTAMP};
pub use crate::query::{QueryCache, QUERY_PREFIX};
pub use crate::store::memory::InMemoryStore;
#[cfg(feature = "redis-backend")]
pub use crate::store::redis::RedisStore;
pub use crate::store::CacheStore;
