//! Grouped cache invalidation.
//!
//! Route handlers call these entry points after a mutation and await them
//! before responding, so a client that was told a write succeeded can never
//! immediately re-read a stale cached list.
//!
//! Store failures are recovered here and reported as a zero count: losing
//! an invalidation degrades freshness until the TTL fires, it never breaks
//! a request.

use crate::key::{CACHE_PREFIX, TAG_PREFIX};
use crate::store::CacheStore;

/// Invalidation entry points over a [`CacheStore`].
///
/// Cheap to clone; clones share the underlying store.
#[derive(Clone)]
pub struct CacheInvalidator<St> {
    store: St,
}

impl<St> CacheInvalidator<St>
where
    St: CacheStore,
{
    pub fn new(store: St) -> Self {
        Self { store }
    }

    /// Deletes every entry associated with any of the given tags, then the
    /// tag sets themselves. Returns how many cache entries were removed.
    ///
    /// An absent or empty tag set is a no-op. Tag sets may reference keys
    /// that already expired on their own; deleting those is also a no-op.
    pub async fn invalidate_tags<I, T>(&self, tags: I) -> u64
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let mut removed = 0;
        for tag in tags {
            let tag = tag.as_ref();
            let set_key = format!("{TAG_PREFIX}{tag}");

            let members = match self.store.smembers(&set_key).await {
                Ok(members) => members,
                Err(err) => {
                    tracing::warn!(tag, error = %err, "tag invalidation failed");
                    continue;
                }
            };

            if !members.is_empty() {
                match self.store.del(&members).await {
                    Ok(count) => {
                        removed += count;
                        tracing::debug!(tag, entries = count, "invalidated tagged entries");
                    }
                    Err(err) => {
                        tracing::warn!(tag, error = %err, "tag member deletion failed");
                        continue;
                    }
                }
            }

            if let Err(err) = self.store.del(&[set_key]).await {
                tracing::warn!(tag, error = %err, "tag set deletion failed");
            }
        }
        removed
    }

    /// Deletes every cache entry whose key matches `cache:` + `pattern` in
    /// one batch. Returns how many entries were removed.
    ///
    /// The pattern is interpreted in the store's native glob dialect and is
    /// not escaped; `*` invalidates every cached response.
    pub async fn invalidate_pattern(&self, pattern: &str) -> u64 {
        let prefixed = format!("{CACHE_PREFIX}{pattern}");
        let keys = match self.store.keys(&prefixed).await {
            Ok(keys) => keys,
            Err(err) => {
                tracing::warn!(pattern = %prefixed, error = %err, "pattern invalidation failed");
                return 0;
            }
        };

        if keys.is_empty() {
            return 0;
        }

        match self.store.del(&keys).await {
            Ok(removed) => {
                tracing::debug!(pattern = %prefixed, entries = removed, "invalidated by pattern");
                removed
            }
            Err(err) => {
                tracing::warn!(pattern = %prefixed, error = %err, "pattern deletion failed");
                0
            }
        }
    }
}
