//! Storefront Cache
//! ================
//!
//! `storefront-cache` provides a response-caching layer for Tower-based
//! services backed by a pluggable key-value store, with tag- and
//! pattern-based invalidation for read-heavy JSON APIs.
//!
//! The crate exposes a single [`CacheLayer`] configured per route with a
//! TTL, a tag list, and an optional skip predicate. Most consumers will
//! start from [`CacheLayer::builder`] with an in-memory or Redis store:
//!
//! ```no_run
//! use std::time::Duration;
//! use tower::{Service, ServiceBuilder, ServiceExt};
//! use storefront_cache::prelude::*;
//!
//! # async fn run() -> Result<(), storefront_cache::layer::BoxError> {
//! let store = InMemoryStore::new();
//! let layer = CacheLayer::builder(store.clone())
//!     .ttl(Duration::from_secs(300))
//!     .tags(["products"])
//!     .build();
//!
//! let mut svc = ServiceBuilder::new()
//!     .layer(layer)
//!     .service(tower::service_fn(|_req| async {
//!         let response = http::Response::builder()
//!             .header("content-type", "application/json")
//!             .body(http_body_util::Full::from(r#"{"products":[]}"#))
//!             .expect("valid response");
//!         Ok::<_, std::convert::Infallible>(response)
//!     }));
//!
//! let response = svc
//!     .ready()
//!     .await?
//!     .call(http::Request::get("/products").body(()).expect("valid request"))
//!     .await?;
//! assert_eq!(response.headers()["x-cache"], "MISS");
//!
//! // After a mutation, drop every "products"-tagged entry before replying.
//! let removed = CacheInvalidator::new(store).invalidate_tags(["products"]).await;
//! # drop(removed);
//! # Ok(())
//! # }
//! ```
//!
//! Responses are served with `X-Cache: HIT|MISS` and `X-Cache-Timestamp`
//! headers. The store is a performance optimization only: any store failure
//! is logged and the request is served from the origin handler.

pub mod admin;
pub mod codec;
pub mod config;
pub mod error;
pub mod invalidate;
pub mod key;
pub mod layer;
pub mod prelude;
pub mod query;
pub mod store;

pub use admin::CacheDiagnostics;
pub use config::CacheConfig;
pub use error::CacheError;
pub use invalidate::CacheInvalidator;
pub use key::KeyGenerator;
pub use layer::{CacheLayer, CacheLayerBuilder};
pub use query::QueryCache;
pub use store::CacheStore;
