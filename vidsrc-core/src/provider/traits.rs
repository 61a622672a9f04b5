// Extractor backend trait
//
// Core interface every site-specific extraction strategy implements

use async_trait::async_trait;

use super::ExtractError;
use crate::models::{EpisodeRef, ExtractionResult};

/// Site-specific source extraction strategy.
///
/// Implementations are stateless across calls: every `resolve` returns its
/// own result vector, so one instance can serve concurrent requests.
#[async_trait]
pub trait ExtractorBackend: Send + Sync {
    /// Registry name (e.g. "vidcdn", "streamsb")
    fn name(&self) -> &str;

    /// Resolve one episode into candidate sources.
    ///
    /// The first entry is the backend's primary pick. An empty result is
    /// reported as [`ExtractError::NoLinksFound`], never as `Ok(vec![])`.
    async fn resolve(&self, episode: &EpisodeRef) -> Result<ExtractionResult, ExtractError>;
}
