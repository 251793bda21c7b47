//! Cache key derivation.
//!
//! Keys are derived from the request method, path, and a canonical JSON
//! rendering of the query parameters, then digested with MD5 to bound key
//! length. The derivation is pure and stable across process restarts, so a
//! warm store survives redeploys.

use std::collections::BTreeMap;
use std::sync::Arc;

use http::{HeaderMap, Method, Uri};
use md5::{Digest, Md5};

/// Prefix applied to every response-cache key in the store.
pub const CACHE_PREFIX: &str = "cache:";

/// Prefix applied to tag member sets in the store.
pub const TAG_PREFIX: &str = "cache:tags:";

/// Type alias for the key derivation function
type KeyFn = Arc<dyn Fn(&Method, &Uri, &HeaderMap) -> String + Send + Sync>;

/// Strategy used to turn requests into cache keys.
///
/// The default digests `method + path + canonical query`. Provide your own
/// function with [`KeyGenerator::custom`] to key on other dimensions, for
/// example a user identifier taken from a request header.
#[derive(Clone)]
pub struct KeyGenerator {
    inner: KeyFn,
}

impl KeyGenerator {
    /// Builds the default generator: an MD5 digest over the request method,
    /// path, and JSON-serialized query map.
    pub fn hashed() -> Self {
        Self {
            inner: Arc::new(|method: &Method, uri: &Uri, _headers: &HeaderMap| {
                let mut hasher = Md5::new();
                hasher.update(method.as_str().as_bytes());
                hasher.update(uri.path().as_bytes());
                hasher.update(canonical_query(uri).as_bytes());
                hex::encode(hasher.finalize())
            }),
        }
    }

    pub fn custom<F>(func: F) -> Self
    where
        F: Fn(&Method, &Uri, &HeaderMap) -> String + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(func),
        }
    }

    /// Derives the key for the provided request parts, without the
    /// [`CACHE_PREFIX`] namespace.
    pub fn generate(&self, method: &Method, uri: &Uri, headers: &HeaderMap) -> String {
        (self.inner)(method, uri, headers)
    }
}

impl Default for KeyGenerator {
    fn default() -> Self {
        Self::hashed()
    }
}

/// Renders the query string as JSON over an ordered multimap so parameter
/// order on the wire does not change the key.
///
/// Values are the raw (undecoded) pair text; two encodings of the same
/// logical parameter hash differently, which costs a duplicate entry but
/// never a wrong hit.
fn canonical_query(uri: &Uri) -> String {
    let mut map: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    if let Some(query) = uri.query() {
        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            map.entry(name).or_default().push(value);
        }
    }
    serde_json::to_string(&map).unwrap_or_default()
}
