//! Cache store trait

use crate::error::CacheError;
use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;

/// Key-value cache with list support and an atomic create-if-absent
///
/// The automation engine keeps its derived rule projections, cooldown
/// markers, and execution-dedupe markers behind this interface. Values are
/// opaque byte strings (JSON in practice).
///
/// Implementations:
/// - `RedisCache`: production Redis backend
/// - `MemoryCache`: in-memory backend for tests and embedded setups
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Get a string value
    async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError>;

    /// Set a string value (no expiry)
    async fn set(&self, key: &str, value: Bytes) -> Result<(), CacheError>;

    /// Atomically create a key with a TTL if it does not exist
    ///
    /// Returns true when this call created the key. This is the one atomic
    /// primitive the engine relies on for cross-task dedupe.
    async fn set_if_absent(
        &self,
        key: &str,
        value: Bytes,
        ttl: Duration,
    ) -> Result<bool, CacheError>;

    /// Delete a key (string or list); returns true if it existed
    async fn delete(&self, key: &str) -> Result<bool, CacheError>;

    /// Append a value to the right of a list, creating it if needed
    async fn list_push(&self, key: &str, value: Bytes) -> Result<(), CacheError>;

    /// Remove the first value-equal entry from a list
    ///
    /// Returns true when an entry was removed.
    async fn list_remove(&self, key: &str, value: &[u8]) -> Result<bool, CacheError>;

    /// Read a full list; a missing key reads as an empty list
    async fn list_range(&self, key: &str) -> Result<Vec<Bytes>, CacheError>;
}
