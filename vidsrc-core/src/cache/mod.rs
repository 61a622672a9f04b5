pub mod key_builder;
pub mod memory;
pub mod redis_store;
pub mod singleflight;
pub mod store;
pub mod tiered;

pub use key_builder::{KeyBuilder, ALL_SOURCES};
pub use memory::MemoryCacheStore;
pub use redis_store::RedisCacheStore;
pub use singleflight::{SingleFlight, SingleFlightError};
pub use store::CacheStore;
#[cfg(test)]
pub use store::MockCacheStore;
pub use tiered::TieredCacheStore;
