//! Redis cache implementation

use crate::error::CacheError;
use crate::store::CacheStore;
use async_trait::async_trait;
use bytes::Bytes;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use std::time::Duration;

/// Redis-backed cache
///
/// Holds one multiplexed connection; clones of it share the underlying
/// socket, so per-call clones are cheap.
pub struct RedisCache {
    conn: MultiplexedConnection,
}

impl RedisCache {
    /// Connect to a Redis instance (e.g. "redis://127.0.0.1/")
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        tracing::info!("Connected to cache at {}", url);
        Ok(Self { conn })
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError> {
        let mut conn = self.conn.clone();
        let value: Option<Vec<u8>> = conn.get(key).await?;
        Ok(value.map(Bytes::from))
    }

    async fn set(&self, key: &str, value: Bytes) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: () = conn.set(key, value.as_ref()).await?;
        Ok(())
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: Bytes,
        ttl: Duration,
    ) -> Result<bool, CacheError> {
        let mut conn = self.conn.clone();
        // SET key value NX EX seconds; the reply is OK on create and nil
        // when the key already exists.
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value.as_ref())
            .arg("NX")
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async(&mut conn)
            .await?;
        Ok(reply.is_some())
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let mut conn = self.conn.clone();
        let removed: i64 = conn.del(key).await?;
        Ok(removed > 0)
    }

    async fn list_push(&self, key: &str, value: Bytes) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: () = conn.rpush(key, value.as_ref()).await?;
        Ok(())
    }

    async fn list_remove(&self, key: &str, value: &[u8]) -> Result<bool, CacheError> {
        let mut conn = self.conn.clone();
        let removed: i64 = conn.lrem(key, 1, value).await?;
        Ok(removed > 0)
    }

    async fn list_range(&self, key: &str) -> Result<Vec<Bytes>, CacheError> {
        let mut conn = self.conn.clone();
        let items: Vec<Vec<u8>> = conn.lrange(key, 0, -1).await?;
        Ok(items.into_iter().map(Bytes::from).collect())
    }
}
