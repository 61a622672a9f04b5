//! Embedded-player backend
//!
//! Fetches a single embed page and scrapes its inline `file: "…"` links.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use vidsrc_providers::fetch::{page_headers, HttpFetcher};
use vidsrc_providers::scrape;

use super::expand::{expand_manifests, tag_links};
use super::{page_url, ExtractError, ExtractorBackend};
use crate::models::{EpisodeRef, ExtractionResult};

/// Scrape one embed page: tag its links and expand any manifest among them.
///
/// Shared with the direct-link backend, which calls it once per embed.
pub async fn extract_embed(fetcher: &dyn HttpFetcher, embed_url: &str) -> Result<ExtractionResult, ExtractError> {
    let body = fetcher
        .fetch(embed_url, &page_headers())
        .await?
        .into_body()?;

    let links = scrape::extract_file_links(&body);
    if links.is_empty() {
        return Err(ExtractError::NoLinksFound(embed_url.to_string()));
    }
    debug!(embed = %embed_url, links = links.len(), "Embed links extracted");

    let mut sources = tag_links(links);
    expand_manifests(fetcher, embed_url, &mut sources).await;
    Ok(sources)
}

/// Embedded-player `ExtractorBackend`
pub struct EmbeddedPlayerBackend {
    name: String,
    page_url: String,
    fetcher: Arc<dyn HttpFetcher>,
}

impl EmbeddedPlayerBackend {
    /// `page_url` is the embed URL template with an `{episode}` placeholder.
    pub fn new(name: impl Into<String>, page_url: impl Into<String>, fetcher: Arc<dyn HttpFetcher>) -> Self {
        Self {
            name: name.into(),
            page_url: page_url.into(),
            fetcher,
        }
    }
}

#[async_trait]
impl ExtractorBackend for EmbeddedPlayerBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn resolve(&self, episode: &EpisodeRef) -> Result<ExtractionResult, ExtractError> {
        let url = page_url(&self.page_url, episode);
        extract_embed(self.fetcher.as_ref(), &url).await
    }
}
