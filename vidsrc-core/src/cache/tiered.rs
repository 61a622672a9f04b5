//! Two-tier cache store (L1: Moka in-memory, L2: shared store)
//!
//! - L1: in-process, very fast, local to the node
//! - L2: optional shared store (Redis in production), consulted on L1 miss

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::{CacheStore, MemoryCacheStore};
use crate::Result;

const CACHE_TYPE: &str = "sources";

/// [`CacheStore`] layering [`MemoryCacheStore`] in front of an optional L2
#[derive(Clone)]
pub struct TieredCacheStore {
    l1: MemoryCacheStore,
    l2: Option<Arc<dyn CacheStore>>,
}

impl TieredCacheStore {
    /// # Arguments
    /// * `l1` - In-memory tier
    /// * `l2` - Shared tier. If None, only L1 caching is used.
    pub fn new(l1: MemoryCacheStore, l2: Option<Arc<dyn CacheStore>>) -> Self {
        Self { l1, l2 }
    }

    pub fn has_l2(&self) -> bool {
        self.l2.is_some()
    }
}

#[async_trait]
impl CacheStore for TieredCacheStore {
    /// Checks L1 first, then L2. An L2 hit repopulates L1 with the entry's
    /// remaining L2 TTL, so L1 never outlives L2.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        if let Some(bytes) = self.l1.get(key).await? {
            crate::metrics::cache::CACHE_HITS
                .with_label_values(&[CACHE_TYPE, "l1"])
                .inc();
            tracing::debug!(key = %key, "Cache hit (L1)");
            return Ok(Some(bytes));
        }

        if let Some(ref l2) = self.l2 {
            if let Some((bytes, remaining)) = l2.get_with_ttl(key).await? {
                crate::metrics::cache::CACHE_HITS
                    .with_label_values(&[CACHE_TYPE, "l2"])
                    .inc();
                tracing::debug!(key = %key, "Cache hit (L2)");

                self.l1.set(key, bytes.clone(), remaining).await?;
                return Ok(Some(bytes));
            }
        }

        crate::metrics::cache::CACHE_MISSES
            .with_label_values(&[CACHE_TYPE, if self.l2.is_some() { "l2" } else { "l1" }])
            .inc();
        tracing::debug!(key = %key, "Cache miss");
        Ok(None)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<()> {
        self.l1.set(key, value.clone(), ttl).await?;
        if let Some(ref l2) = self.l2 {
            l2.set(key, value, ttl).await?;
        }
        Ok(())
    }

    /// L2 is invalidated first so a concurrent `get` cannot copy a stale L2
    /// entry back into L1 after L1 was cleared.
    async fn del(&self, key: &str) -> Result<()> {
        if let Some(ref l2) = self.l2 {
            l2.del(key).await?;
        }
        self.l1.del(key).await?;

        crate::metrics::cache::CACHE_INVALIDATIONS
            .with_label_values(&[CACHE_TYPE])
            .inc();
        tracing::debug!(key = %key, "Cache entry invalidated (L2 then L1)");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MockCacheStore;
    use mockall::predicate::eq;

    #[tokio::test]
    async fn test_l1_only() {
        let store = TieredCacheStore::new(MemoryCacheStore::new(10, None), None);
        assert!(!store.has_l2());

        store.set("k", b"v".to_vec(), None).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(b"v".to_vec()));
        store.del("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_l2_hit_populates_l1() {
        let mut l2 = MockCacheStore::new();
        l2.expect_get_with_ttl()
            .with(eq("k"))
            .times(1)
            .returning(|_| Ok(Some((b"shared".to_vec(), None))));

        let l1 = MemoryCacheStore::new(10, None);
        let store = TieredCacheStore::new(l1.clone(), Some(Arc::new(l2)));

        assert_eq!(store.get("k").await.unwrap(), Some(b"shared".to_vec()));
        // Second read is served by L1; the mock would panic on a second call.
        assert_eq!(store.get("k").await.unwrap(), Some(b"shared".to_vec()));
        assert_eq!(l1.get("k").await.unwrap(), Some(b"shared".to_vec()));
    }

    #[tokio::test]
    async fn test_l1_copy_expires_with_l2_entry() {
        let mut l2 = MockCacheStore::new();
        l2.expect_get_with_ttl()
            .with(eq("k"))
            .times(2)
            .returning(|_| Ok(Some((b"shared".to_vec(), Some(Duration::from_millis(50))))));

        let l1 = MemoryCacheStore::new(10, Some(Duration::from_secs(3600)));
        let store = TieredCacheStore::new(l1.clone(), Some(Arc::new(l2)));

        assert_eq!(store.get("k").await.unwrap(), Some(b"shared".to_vec()));
        assert_eq!(l1.get("k").await.unwrap(), Some(b"shared".to_vec()));

        std::thread::sleep(Duration::from_millis(120));

        // The L1 copy is gone, so L2 is consulted again.
        assert_eq!(l1.get("k").await.unwrap(), None);
        assert_eq!(store.get("k").await.unwrap(), Some(b"shared".to_vec()));
    }

    #[tokio::test]
    async fn test_writes_and_deletes_reach_both_tiers() {
        let mut l2 = MockCacheStore::new();
        l2.expect_set()
            .withf(|key, value, ttl| key == "k" && value == b"v" && *ttl == Some(Duration::from_secs(60)))
            .times(1)
            .returning(|_, _, _| Ok(()));
        l2.expect_del().with(eq("k")).times(1).returning(|_| Ok(()));

        let l1 = MemoryCacheStore::new(10, None);
        let store = TieredCacheStore::new(l1.clone(), Some(Arc::new(l2)));

        store.set("k", b"v".to_vec(), Some(Duration::from_secs(60))).await.unwrap();
        assert_eq!(l1.get("k").await.unwrap(), Some(b"v".to_vec()));

        store.del("k").await.unwrap();
        assert_eq!(l1.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_l2_failure_propagates() {
        let mut l2 = MockCacheStore::new();
        l2.expect_get_with_ttl()
            .returning(|_| Err(crate::Error::Cache("connection reset".to_string())));

        let store = TieredCacheStore::new(MemoryCacheStore::new(10, None), Some(Arc::new(l2)));
        assert!(store.get("k").await.is_err());
    }
}
