// Fallback resolver
//
// Adapter over vidsrc_providers::FallbackApiClient. Consulted by the
// aggregator only after a primary backend failed.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use vidsrc_providers::fetch::HttpFetcher;
use vidsrc_providers::{FallbackApiClient, FallbackSource};

use super::{ExtractError, ExtractorBackend};
use crate::models::{EpisodeRef, ExtractionResult, VideoSource, QUALITY_DEFAULT, QUALITY_UNKNOWN};

pub const FALLBACK_BACKEND_NAME: &str = "fallback";

/// Fallback `ExtractorBackend` backed by the independent source API.
pub struct ApiFallbackBackend {
    client: FallbackApiClient,
    fetcher: Arc<dyn HttpFetcher>,
}

impl ApiFallbackBackend {
    pub fn new(base_url: impl Into<String>, fetcher: Arc<dyn HttpFetcher>) -> Self {
        Self {
            client: FallbackApiClient::new(base_url),
            fetcher,
        }
    }
}

#[async_trait]
impl ExtractorBackend for ApiFallbackBackend {
    fn name(&self) -> &str {
        FALLBACK_BACKEND_NAME
    }

    async fn resolve(&self, episode: &EpisodeRef) -> Result<ExtractionResult, ExtractError> {
        let sources = self
            .client
            .sources(self.fetcher.as_ref(), episode.as_str())
            .await?;

        if sources.is_empty() {
            return Err(ExtractError::NoLinksFound(self.client.endpoint(episode.as_str())?));
        }
        debug!(episode = %episode, sources = sources.len(), "Fallback API answered");

        Ok(sources.into_iter().map(to_video_source).collect())
    }
}

fn to_video_source(source: FallbackSource) -> VideoSource {
    let quality = source
        .quality
        .as_deref()
        .map_or_else(|| QUALITY_UNKNOWN.to_string(), normalize_quality);
    VideoSource::new(source.url, quality, source.is_m3u8)
}

/// `"1080p"` -> `"1080"`, `"auto"` -> `"default"`, anything else lowercased.
fn normalize_quality(raw: &str) -> String {
    let raw = raw.trim().to_ascii_lowercase();
    if raw.is_empty() {
        return QUALITY_UNKNOWN.to_string();
    }
    if raw == "auto" {
        return QUALITY_DEFAULT.to_string();
    }
    match raw.strip_suffix('p') {
        Some(digits) if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) => digits.to_string(),
        _ => raw,
    }
}
