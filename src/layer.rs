use std::error::Error as StdError;
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use chrono::{SecondsFormat, Utc};
use futures_util::future::BoxFuture;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderName, HeaderValue, Method, Request, Response, StatusCode, Uri};
use http_body::Body;
use http_body_util::{BodyExt, Full};
use tower::{Layer, Service, ServiceExt};

use crate::codec::{CacheRecord, JsonCodec, RecordCodec};
use crate::config::CacheConfig;
use crate::key::{KeyGenerator, CACHE_PREFIX, TAG_PREFIX};
use crate::store::CacheStore;

pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Cache status header: `HIT` or `MISS`.
pub const X_CACHE: HeaderName = HeaderName::from_static("x-cache");

/// Timestamp header carrying when the served entry was stored.
pub const X_CACHE_TIMESTAMP: HeaderName = HeaderName::from_static("x-cache-timestamp");

/// Configurable caching layer for Tower services.
///
/// The layer wraps an inner service and memoizes its JSON responses in the
/// configured [`CacheStore`]. GET requests are looked up first; a hit is
/// served straight from the store with `X-Cache: HIT` and the inner service
/// never runs. A miss runs the inner service, stores 2xx JSON payloads with
/// the route's TTL and tags, and annotates the response with
/// `X-Cache: MISS`. Store failures are logged and degrade to pass-through.
///
/// Cloning a `CacheLayer` is cheap and shares the underlying store.
///
/// ```no_run
/// use std::time::Duration;
/// use storefront_cache::prelude::*;
///
/// let layer = CacheLayer::builder(InMemoryStore::new())
///     .ttl(Duration::from_secs(300))
///     .tags(["products"])
///     .build();
/// ```
#[derive(Clone)]
pub struct CacheLayer<St, C = JsonCodec> {
    store: St,
    config: CacheConfig,
    key_generator: KeyGenerator,
    codec: C,
}

/// Builder for configuring [`CacheLayer`] instances.
pub struct CacheLayerBuilder<St, C = JsonCodec> {
    store: St,
    config: CacheConfig,
    key_generator: KeyGenerator,
    codec: C,
}

impl<St> CacheLayerBuilder<St, JsonCodec>
where
    St: CacheStore,
{
    pub fn new(store: St) -> Self {
        Self {
            store,
            config: CacheConfig::default(),
            key_generator: KeyGenerator::default(),
            codec: JsonCodec,
        }
    }
}

impl<St, C> CacheLayerBuilder<St, C>
where
    St: CacheStore,
    C: RecordCodec,
{
    /// Replaces the route configuration with a pre-built value.
    pub fn config(mut self, config: CacheConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the TTL for stored entries.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.config = self.config.with_ttl(ttl);
        self
    }

    /// Sets the tags attached to every entry this layer stores.
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config = self.config.with_tags(tags);
        self
    }

    /// Bypasses caching for requests where `predicate` returns true.
    pub fn skip_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Method, &Uri, &HeaderMap) -> bool + Send + Sync + 'static,
    {
        self.config = self.config.with_skip_predicate(predicate);
        self
    }

    pub fn key_generator(mut self, generator: KeyGenerator) -> Self {
        self.key_generator = generator;
        self
    }

    pub fn codec<NC: RecordCodec>(self, codec: NC) -> CacheLayerBuilder<St, NC> {
        CacheLayerBuilder {
            store: self.store,
            config: self.config,
            key_generator: self.key_generator,
            codec,
        }
    }

    pub fn build(self) -> CacheLayer<St, C> {
        CacheLayer {
            store: self.store,
            config: self.config,
            key_generator: self.key_generator,
            codec: self.codec,
        }
    }
}

impl<St> CacheLayer<St, JsonCodec>
where
    St: CacheStore,
{
    /// Builds a cache layer with the default [`CacheConfig`].
    pub fn new(store: St) -> Self {
        CacheLayerBuilder::new(store).build()
    }

    /// Returns a builder for fine-grained control over the configuration.
    pub fn builder(store: St) -> CacheLayerBuilder<St, JsonCodec> {
        CacheLayerBuilder::new(store)
    }
}

impl<S, St, C> Layer<S> for CacheLayer<St, C>
where
    St: CacheStore,
    C: RecordCodec,
{
    type Service = CacheService<S, St, C>;

    fn layer(&self, inner: S) -> Self::Service {
        CacheService {
            inner,
            store: self.store.clone(),
            config: self.config.clone(),
            key_generator: self.key_generator.clone(),
            codec: self.codec.clone(),
        }
    }
}

#[derive(Clone)]
pub struct CacheService<S, St, C = JsonCodec> {
    inner: S,
    store: St,
    config: CacheConfig,
    key_generator: KeyGenerator,
    codec: C,
}

impl<S, St, C, ReqBody, ResBody> Service<Request<ReqBody>> for CacheService<S, St, C>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Into<BoxError> + Send,
    ReqBody: Send + 'static,
    ResBody: Body<Data = Bytes> + Send + 'static,
    ResBody::Error: Into<BoxError> + Send,
    St: CacheStore,
    C: RecordCodec,
{
    type Response = Response<Full<Bytes>>;
    type Error = BoxError;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(Into::into)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let method = req.method().clone();
        let uri = req.uri().clone();

        // Only read-only requests are cacheable; everything else passes
        // through untouched, regardless of the skip predicate.
        let key = if method == Method::GET
            && !self.config.should_skip(&method, &uri, req.headers())
        {
            Some(format!(
                "{CACHE_PREFIX}{}",
                self.key_generator.generate(&method, &uri, req.headers())
            ))
        } else {
            None
        };

        let store = self.store.clone();
        let config = self.config.clone();
        let codec = self.codec.clone();
        let inner = self.inner.clone();

        Box::pin(async move {
            let mut lookup_failed = false;
            if let Some(ref key) = key {
                match store.get(key).await {
                    Ok(Some(bytes)) => match codec.decode(&bytes) {
                        Ok(record) => {
                            tracing::debug!(key = %key, uri = %uri, "cache hit");
                            return Ok(hit_response(record));
                        }
                        Err(err) => {
                            tracing::warn!(key = %key, error = %err, "undecodable cache record, treating as miss");
                        }
                    },
                    Ok(None) => {
                        tracing::debug!(key = %key, uri = %uri, "cache miss");
                    }
                    Err(err) => {
                        // Cache is an optimization; the origin still answers.
                        lookup_failed = true;
                        tracing::warn!(key = %key, error = %err, "cache lookup failed, serving from origin");
                    }
                }
            }

            let response = inner.oneshot(req).await.map_err(Into::into)?;
            let (mut parts, body) = response.into_parts();
            let collected = BodyExt::collect(body).await.map_err(Into::into)?;
            let bytes = collected.to_bytes();

            let now = Utc::now();
            if let Some(ref key) = key {
                if !lookup_failed && parts.status.is_success() && is_json_response(&parts.headers) {
                    store_entry(&store, &config, &codec, key, parts.status, &bytes, now).await;
                }

                parts.headers.insert(X_CACHE, HeaderValue::from_static("MISS"));
                if let Ok(value) =
                    HeaderValue::from_str(&now.to_rfc3339_opts(SecondsFormat::Millis, true))
                {
                    parts.headers.insert(X_CACHE_TIMESTAMP, value);
                }
            }

            Ok(Response::from_parts(parts, Full::from(bytes)))
        })
    }
}

/// Writes a fresh entry and its tag-set memberships.
///
/// Every failure is recovered here: a response the origin already produced
/// must never be lost to a cache write.
async fn store_entry<St, C>(
    store: &St,
    config: &CacheConfig,
    codec: &C,
    key: &str,
    status: StatusCode,
    bytes: &Bytes,
    stored_at: chrono::DateTime<Utc>,
) where
    St: CacheStore,
    C: RecordCodec,
{
    let body = match String::from_utf8(bytes.to_vec()) {
        Ok(body) => body,
        Err(_) => {
            tracing::debug!(key, "response body is not UTF-8, skipping cache");
            return;
        }
    };

    let record = CacheRecord::new(status.as_u16(), body, stored_at, config.tags().to_vec());
    let encoded = match codec.encode(&record) {
        Ok(encoded) => encoded,
        Err(err) => {
            tracing::warn!(key, error = %err, "failed to encode cache record");
            return;
        }
    };

    if let Err(err) = store.set_ex(key, encoded, config.ttl()).await {
        tracing::warn!(key, error = %err, "cache write failed, serving from origin only");
        return;
    }
    tracing::debug!(key, ttl = ?config.ttl(), "cached response");

    for tag in config.tags() {
        let set_key = format!("{TAG_PREFIX}{tag}");
        if let Err(err) = store.sadd(&set_key, key).await {
            tracing::warn!(key = %key, tag = %tag, error = %err, "failed to index cache tag");
        }
    }
}

/// Rebuilds an HTTP response from a stored record.
fn hit_response(record: CacheRecord) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::from(Bytes::from(record.body.into_bytes())));
    *response.status_mut() =
        StatusCode::from_u16(record.status).unwrap_or(StatusCode::OK);

    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(X_CACHE, HeaderValue::from_static("HIT"));
    if let Ok(value) = HeaderValue::from_str(
        &record.stored_at.to_rfc3339_opts(SecondsFormat::Millis, true),
    ) {
        headers.insert(X_CACHE_TIMESTAMP, value);
    }

    response
}

/// Whether the response declares a JSON content type.
///
/// The cache only captures JSON payloads; other content types pass through
/// uncached.
fn is_json_response(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| {
            value
                .trim_start()
                .to_ascii_lowercase()
                .starts_with("application/json")
        })
        .unwrap_or(false)
}
