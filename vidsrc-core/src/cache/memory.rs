//! In-process cache store (Moka)
//!
//! Bounded by entry count. Each entry carries its own TTL, so a store built
//! with a default TTL still honours shorter TTLs passed to `set`.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::future::Cache;
use moka::Expiry;

use super::CacheStore;
use crate::Result;

#[derive(Clone)]
struct StoredValue {
    bytes: Vec<u8>,
    ttl: Option<Duration>,
}

struct EntryExpiry {
    default_ttl: Option<Duration>,
}

impl Expiry<String, StoredValue> for EntryExpiry {
    fn expire_after_create(&self, _key: &String, value: &StoredValue, _created_at: Instant) -> Option<Duration> {
        value.ttl.or(self.default_ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &StoredValue,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        value.ttl.or(self.default_ttl)
    }
}

/// Moka-backed [`CacheStore`]
#[derive(Clone)]
pub struct MemoryCacheStore {
    cache: Cache<String, StoredValue>,
}

impl MemoryCacheStore {
    /// # Arguments
    /// * `max_capacity` - Maximum number of entries
    /// * `default_ttl` - TTL for entries stored without one; `None` keeps them until evicted
    #[must_use]
    pub fn new(max_capacity: u64, default_ttl: Option<Duration>) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(EntryExpiry { default_ttl })
            .build();
        Self { cache }
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.cache.get(key).await.map(|v| v.bytes))
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<()> {
        self.cache
            .insert(key.to_string(), StoredValue { bytes: value, ttl })
            .await;
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<()> {
        self.cache.invalidate(key).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_del() {
        let store = MemoryCacheStore::new(100, None);

        assert_eq!(store.get("k").await.unwrap(), None);
        store.set("k", b"value".to_vec(), None).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(b"value".to_vec()));

        store.set("k", b"other".to_vec(), None).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(b"other".to_vec()));

        store.del("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_per_entry_ttl() {
        let store = MemoryCacheStore::new(100, Some(Duration::from_secs(3600)));

        store
            .set("short", b"a".to_vec(), Some(Duration::from_millis(50)))
            .await
            .unwrap();
        store.set("long", b"b".to_vec(), None).await.unwrap();

        std::thread::sleep(Duration::from_millis(120));

        assert_eq!(store.get("short").await.unwrap(), None);
        assert_eq!(store.get("long").await.unwrap(), Some(b"b".to_vec()));
    }
}
