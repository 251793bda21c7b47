use http::{HeaderMap, Method, Uri};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Type alias for the skip predicate function
type SkipPredicateFn = Arc<dyn Fn(&Method, &Uri, &HeaderMap) -> bool + Send + Sync>;

/// Default time-to-live for cached responses: five minutes.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Per-route cache configuration shared by the layer and service.
///
/// Configs are cheap to clone and immutable; the `with_*` builder helpers
/// return new copies with the requested change.
#[derive(Clone)]
pub struct CacheConfig {
    ttl: Duration,
    tags: Vec<String>,
    skip: Option<SkipPredicateFn>,
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time-to-live applied to stored entries.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Tags attached to every entry this route stores.
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Evaluates the skip predicate for a request.
    ///
    /// Without a configured predicate nothing is skipped.
    pub fn should_skip(&self, method: &Method, uri: &Uri, headers: &HeaderMap) -> bool {
        match &self.skip {
            Some(predicate) => predicate(method, uri, headers),
            None => false,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Bypasses caching for requests where `predicate` returns true.
    pub fn with_skip_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Method, &Uri, &HeaderMap) -> bool + Send + Sync + 'static,
    {
        self.skip = Some(Arc::new(predicate));
        self
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            tags: Vec::new(),
            skip: None,
        }
    }
}

impl fmt::Debug for CacheConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheConfig")
            .field("ttl", &self.ttl)
            .field("tags", &self.tags)
            .field("skip", &self.skip.as_ref().map(|_| "<predicate>"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_route_defaults() {
        let config = CacheConfig::default();
        assert_eq!(config.ttl(), Duration::from_secs(300));
        assert!(config.tags().is_empty());

        let uri: Uri = "/products".parse().expect("valid uri");
        assert!(!config.should_skip(&Method::GET, &uri, &HeaderMap::new()));
    }

    #[test]
    fn builder_overrides_apply() {
        let config = CacheConfig::new()
            .with_ttl(Duration::from_secs(600))
            .with_tags(["products", "featured"])
            .with_skip_predicate(|_, uri, _| uri.path().starts_with("/admin"));

        assert_eq!(config.ttl(), Duration::from_secs(600));
        assert_eq!(config.tags(), ["products", "featured"]);

        let admin: Uri = "/admin/users".parse().expect("valid uri");
        let shop: Uri = "/products".parse().expect("valid uri");
        assert!(config.should_skip(&Method::GET, &admin, &HeaderMap::new()));
        assert!(!config.should_skip(&Method::GET, &shop, &HeaderMap::new()));
    }
}
