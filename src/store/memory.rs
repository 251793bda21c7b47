use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use super::CacheStore;
use crate::error::CacheError;

/// An in-process [`CacheStore`] backed by [`dashmap`].
///
/// Expiry is enforced lazily: expired entries are dropped when read or
/// scanned. Sets (used for tag membership) do not expire, matching the
/// Redis layout where tag sets are written without a TTL.
///
/// The store is cheap to clone and shares the underlying maps, which makes
/// it the natural substitute for Redis in tests.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    values: Arc<DashMap<String, StoredValue>>,
    sets: Arc<DashMap<String, HashSet<String>>>,
}

#[derive(Clone)]
struct StoredValue {
    bytes: Vec<u8>,
    expires_at: SystemTime,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn live_value(&self, key: &str) -> Option<Vec<u8>> {
        let expired = match self.values.get(key) {
            Some(stored) if SystemTime::now() <= stored.expires_at => {
                return Some(stored.bytes.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            self.values
                .remove_if(key, |_, stored| SystemTime::now() > stored.expires_at);
        }
        None
    }
}

#[async_trait]
impl CacheStore for InMemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Ok(self.live_value(key))
    }

    async fn set_ex(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        if ttl.is_zero() {
            return Ok(());
        }
        self.values.insert(
            key.to_owned(),
            StoredValue {
                bytes: value,
                expires_at: SystemTime::now() + ttl,
            },
        );
        Ok(())
    }

    async fn del(&self, keys: &[String]) -> Result<u64, CacheError> {
        let mut removed = 0;
        for key in keys {
            if self.live_value(key).is_some() && self.values.remove(key).is_some() {
                removed += 1;
            }
            if self.sets.remove(key).is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, CacheError> {
        let now = SystemTime::now();
        let mut matches: Vec<String> = self
            .values
            .iter()
            .filter(|entry| now <= entry.value().expires_at)
            .map(|entry| entry.key().clone())
            .filter(|key| glob_match(pattern, key))
            .collect();
        matches.extend(
            self.sets
                .iter()
                .map(|entry| entry.key().clone())
                .filter(|key| glob_match(pattern, key)),
        );
        Ok(matches)
    }

    async fn sadd(&self, set: &str, member: &str) -> Result<(), CacheError> {
        self.sets
            .entry(set.to_owned())
            .or_default()
            .insert(member.to_owned());
        Ok(())
    }

    async fn smembers(&self, set: &str) -> Result<Vec<String>, CacheError> {
        Ok(self
            .sets
            .get(set)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }
}

/// Matches `text` against a Redis-style glob pattern.
///
/// Supports `*`, `?`, `[...]` classes (with `^` negation and `a-z` ranges),
/// and `\` escapes. An unclosed class is treated as a literal `[`.
fn glob_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    let (mut pi, mut ti) = (0usize, 0usize);
    let mut star: Option<(usize, usize)> = None;

    while ti < t.len() {
        let step = if pi < p.len() {
            match p[pi] {
                '*' => {
                    star = Some((pi, ti));
                    pi += 1;
                    continue;
                }
                '?' => Some(1),
                '[' => match match_class(&p, pi, t[ti]) {
                    Some((true, next)) => {
                        pi = next;
                        ti += 1;
                        continue;
                    }
                    Some((false, _)) => None,
                    None => ('[' == t[ti]).then_some(1),
                },
                '\\' if pi + 1 < p.len() => (p[pi + 1] == t[ti]).then_some(2),
                c => (c == t[ti]).then_some(1),
            }
        } else {
            None
        };

        match step {
            Some(advance) => {
                pi += advance;
                ti += 1;
            }
            None => match star {
                Some((star_pi, star_ti)) => {
                    star = Some((star_pi, star_ti + 1));
                    pi = star_pi + 1;
                    ti = star_ti + 1;
                }
                None => return false,
            },
        }
    }

    while pi < p.len() && p[pi] == '*' {
        pi += 1;
    }
    pi == p.len()
}

/// Evaluates a `[...]` class starting at `p[open]` against `c`.
///
/// Returns the match result and the index past the closing bracket, or
/// `None` when the class never closes.
fn match_class(p: &[char], open: usize, c: char) -> Option<(bool, usize)> {
    let mut i = open + 1;
    let negate = p.get(i) == Some(&'^');
    if negate {
        i += 1;
    }

    let mut matched = false;
    while i < p.len() && p[i] != ']' {
        if p[i] == '\\' && i + 1 < p.len() {
            matched |= p[i + 1] == c;
            i += 2;
        } else if p.get(i + 1) == Some(&'-') && i + 2 < p.len() && p[i + 2] != ']' {
            matched |= p[i] <= c && c <= p[i + 2];
            i += 3;
        } else {
            matched |= p[i] == c;
            i += 1;
        }
    }

    if i < p.len() {
        Some((matched != negate, i + 1))
    } else {
        None
    }
}
