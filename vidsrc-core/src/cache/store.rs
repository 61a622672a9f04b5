// Cache store contract

use std::time::Duration;

use async_trait::async_trait;

use crate::Result;

/// Byte-oriented key/value store with optional per-entry TTL.
///
/// Operations are assumed atomic per key; callers never rely on ordering
/// across keys.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Value plus its remaining TTL, for stores that track one.
    async fn get_with_ttl(&self, key: &str) -> Result<Option<(Vec<u8>, Option<Duration>)>> {
        Ok(self.get(key).await?.map(|value| (value, None)))
    }

    /// Store `value`; `ttl = None` means the store's own default.
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<()>;

    async fn del(&self, key: &str) -> Result<()>;
}
