//! Direct-link backend
//!
//! Fetches an episode listing page, collects the embed URLs it advertises
//! (iframes and `data-video` attributes) and scrapes every embed, keeping
//! page order in the concatenated result.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use tracing::{debug, warn};
use vidsrc_providers::fetch::{page_headers, HttpFetcher};
use vidsrc_providers::scrape;

use super::embedded::extract_embed;
use super::{page_url, ExtractError, ExtractorBackend};
use crate::models::{EpisodeRef, ExtractionResult};

/// Direct-link `ExtractorBackend`
pub struct DirectLinkBackend {
    name: String,
    page_url: String,
    fetcher: Arc<dyn HttpFetcher>,
}

impl DirectLinkBackend {
    /// `page_url` is the listing page template with an `{episode}` placeholder.
    pub fn new(name: impl Into<String>, page_url: impl Into<String>, fetcher: Arc<dyn HttpFetcher>) -> Self {
        Self {
            name: name.into(),
            page_url: page_url.into(),
            fetcher,
        }
    }
}

#[async_trait]
impl ExtractorBackend for DirectLinkBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn resolve(&self, episode: &EpisodeRef) -> Result<ExtractionResult, ExtractError> {
        let listing_url = page_url(&self.page_url, episode);
        let (base, body) = self
            .fetcher
            .fetch(&listing_url, &page_headers())
            .await?
            .into_parts()?;

        let embeds = scrape::extract_embed_urls(&body, &base);
        if embeds.is_empty() {
            return Err(ExtractError::NoLinksFound(listing_url));
        }
        debug!(backend = %self.name, embeds = embeds.len(), "Listing page scraped");

        let fetcher = self.fetcher.as_ref();
        let results = join_all(embeds.iter().map(|embed| extract_embed(fetcher, embed))).await;

        let mut sources = ExtractionResult::new();
        let mut upstream_error = None;
        for (embed, result) in embeds.iter().zip(results) {
            match result {
                Ok(found) => sources.extend(found),
                Err(e) => {
                    warn!(backend = %self.name, embed = %embed, error = %e, "Embed extraction failed");
                    if upstream_error.is_none() && !matches!(e, ExtractError::NoLinksFound(_)) {
                        upstream_error = Some(e);
                    }
                }
            }
        }

        if !sources.is_empty() {
            return Ok(sources);
        }
        // Nothing usable: an unreachable embed outranks an empty one.
        Err(upstream_error.unwrap_or(ExtractError::NoLinksFound(listing_url)))
    }
}
