//! Shared cache store (Redis)

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

use super::CacheStore;
use crate::{Error, Result};

/// Redis-backed [`CacheStore`]
///
/// Uses a `ConnectionManager`, which reconnects on its own; clones share the
/// underlying multiplexed connection.
#[derive(Clone)]
pub struct RedisCacheStore {
    conn: ConnectionManager,
    default_ttl: Option<Duration>,
}

impl RedisCacheStore {
    /// Connect to `redis_url`.
    pub async fn connect(redis_url: &str, default_ttl: Option<Duration>) -> Result<Self> {
        let client = Client::open(redis_url)?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| Error::Cache(format!("Redis connection failed: {e}")))?;
        Ok(Self { conn, default_ttl })
    }
}

/// `PTTL` reply to a remaining TTL. `-1` (no expiry) and `-2` (missing) map
/// to `None`.
fn remaining_ttl(pttl_ms: i64) -> Option<Duration> {
    u64::try_from(pttl_ms)
        .ok()
        .filter(|ms| *ms > 0)
        .map(Duration::from_millis)
}

/// Redis expiry in whole seconds, never below one.
fn ttl_seconds(ttl: Duration) -> u64 {
    let secs = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
    secs.max(1)
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.conn.clone();
        let value: Option<Vec<u8>> = conn
            .get(key)
            .await
            .map_err(|e| Error::Cache(format!("Failed to get {key} from cache: {e}")))?;
        Ok(value)
    }

    async fn get_with_ttl(&self, key: &str) -> Result<Option<(Vec<u8>, Option<Duration>)>> {
        let mut conn = self.conn.clone();
        let (value, pttl): (Option<Vec<u8>>, i64) = redis::pipe()
            .atomic()
            .get(key)
            .pttl(key)
            .query_async(&mut conn)
            .await
            .map_err(|e| Error::Cache(format!("Failed to get {key} from cache: {e}")))?;
        Ok(value.map(|value| (value, remaining_ttl(pttl))))
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<()> {
        let mut conn = self.conn.clone();
        match ttl.or(self.default_ttl) {
            Some(ttl) => {
                let _: () = conn
                    .set_ex(key, value, ttl_seconds(ttl))
                    .await
                    .map_err(|e| Error::Cache(format!("Failed to set {key} in cache: {e}")))?;
            }
            None => {
                let _: () = conn
                    .set(key, value)
                    .await
                    .map_err(|e| Error::Cache(format!("Failed to set {key} in cache: {e}")))?;
            }
        }
        tracing::debug!(key = %key, "Cache entry written to Redis");
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .del(key)
            .await
            .map_err(|e| Error::Cache(format!("Failed to invalidate {key}: {e}")))?;
        Ok(())
    }
}
