//! In-memory cache implementation
//!
//! DashMap-backed, TTL-aware. Used by the test suites and by embedded
//! deployments that run without a Redis instance.

use crate::error::CacheError;
use crate::store::CacheStore;
use async_trait::async_trait;
use bytes::Bytes;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct StringEntry {
    value: Bytes,
    expires_at: Option<Instant>,
}

impl StringEntry {
    fn new(value: Bytes, ttl: Option<Duration>) -> Self {
        Self {
            value,
            expires_at: ttl.map(|t| Instant::now() + t),
        }
    }

    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }
}

/// In-memory cache with concurrent access support
#[derive(Default)]
pub struct MemoryCache {
    strings: DashMap<String, StringEntry>,
    lists: DashMap<String, Vec<Bytes>>,
}

impl MemoryCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop all entries (useful for tests)
    pub fn clear(&self) {
        self.strings.clear();
        self.lists.clear();
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError> {
        Ok(self
            .strings
            .get(key)
            .filter(|e| !e.is_expired())
            .map(|e| e.value.clone()))
    }

    async fn set(&self, key: &str, value: Bytes) -> Result<(), CacheError> {
        self.strings
            .insert(key.to_string(), StringEntry::new(value, None));
        Ok(())
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: Bytes,
        ttl: Duration,
    ) -> Result<bool, CacheError> {
        // The entry API holds the shard lock across the check and the
        // insert, which is what makes concurrent callers see exactly one
        // winner.
        match self.strings.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_expired() {
                    occupied.insert(StringEntry::new(value, Some(ttl)));
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(StringEntry::new(value, Some(ttl)));
                Ok(true)
            }
        }
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let had_string = self.strings.remove(key).is_some();
        let had_list = self.lists.remove(key).is_some();
        Ok(had_string || had_list)
    }

    async fn list_push(&self, key: &str, value: Bytes) -> Result<(), CacheError> {
        self.lists.entry(key.to_string()).or_default().push(value);
        Ok(())
    }

    async fn list_remove(&self, key: &str, value: &[u8]) -> Result<bool, CacheError> {
        let Some(mut list) = self.lists.get_mut(key) else {
            return Ok(false);
        };
        match list.iter().position(|v| v.as_ref() == value) {
            Some(index) => {
                list.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_range(&self, key: &str) -> Result<Vec<Bytes>, CacheError> {
        Ok(self
            .lists
            .get(key)
            .map(|l| l.clone())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn set_if_absent_respects_existing_key() {
        let cache = MemoryCache::new();
        let created = cache
            .set_if_absent("k", Bytes::from("1"), Duration::from_secs(60))
            .await
            .unwrap();
        assert!(created);

        let created_again = cache
            .set_if_absent("k", Bytes::from("2"), Duration::from_secs(60))
            .await
            .unwrap();
        assert!(!created_again);
        assert_eq!(cache.get("k").await.unwrap(), Some(Bytes::from("1")));
    }

    #[tokio::test]
    async fn set_if_absent_reclaims_expired_key() {
        let cache = MemoryCache::new();
        cache
            .set_if_absent("k", Bytes::from("1"), Duration::from_millis(0))
            .await
            .unwrap();

        // Zero TTL expires immediately
        assert_eq!(cache.get("k").await.unwrap(), None);
        let created = cache
            .set_if_absent("k", Bytes::from("2"), Duration::from_secs(60))
            .await
            .unwrap();
        assert!(created);
    }

    #[tokio::test]
    async fn concurrent_set_if_absent_has_one_winner() {
        let cache = Arc::new(MemoryCache::new());
        let a = {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move {
                cache
                    .set_if_absent("guard", Bytes::from("a"), Duration::from_secs(60))
                    .await
                    .unwrap()
            })
        };
        let b = {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move {
                cache
                    .set_if_absent("guard", Bytes::from("b"), Duration::from_secs(60))
                    .await
                    .unwrap()
            })
        };

        let (a, b) = (a.await.unwrap(), b.await.unwrap());
        assert!(a ^ b, "exactly one concurrent caller must win");
    }

    #[tokio::test]
    async fn list_remove_drops_first_match_only() {
        let cache = MemoryCache::new();
        cache.list_push("l", Bytes::from("x")).await.unwrap();
        cache.list_push("l", Bytes::from("y")).await.unwrap();
        cache.list_push("l", Bytes::from("x")).await.unwrap();

        assert!(cache.list_remove("l", b"x").await.unwrap());
        let remaining = cache.list_range("l").await.unwrap();
        assert_eq!(remaining, vec![Bytes::from("y"), Bytes::from("x")]);

        assert!(!cache.list_remove("l", b"missing").await.unwrap());
    }

    #[tokio::test]
    async fn missing_list_reads_empty() {
        let cache = MemoryCache::new();
        assert!(cache.list_range("absent").await.unwrap().is_empty());
    }
}
