pub mod models;
pub mod manifest;
pub mod provider;
pub mod quality;
pub mod cache;
pub mod aggregator;
pub mod config;
pub mod error;
pub mod logging;
pub mod bootstrap;
pub mod metrics;

#[cfg(test)]
pub mod test_helpers;

pub use aggregator::ResolutionAggregator;
pub use cache::{CacheStore, KeyBuilder};
pub use config::Config;
pub use error::{Error, ErrorPayload, ResolveError, Result};
pub use provider::{BackendRegistry, ExtractError, ExtractorBackend};
