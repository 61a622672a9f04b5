//! Fallback source API client
//!
//! Independent JSON API consulted after a primary backend fails.
//! `GET {base_url}/{episode}` answers with
//! `{"sources": [{"url": "…", "quality": "720p", "isM3U8": true}]}`.

use serde::Deserialize;
use url::Url;

use crate::error::ProviderClientError;
use crate::fetch::{page_headers, HttpFetcher};

/// One source as reported by the fallback API.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FallbackSource {
    pub url: String,
    #[serde(default)]
    pub quality: Option<String>,
    #[serde(default, rename = "isM3U8")]
    pub is_m3u8: bool,
}

#[derive(Debug, Deserialize)]
struct FallbackResponse {
    #[serde(default)]
    sources: Vec<FallbackSource>,
}

/// Fallback API client.
pub struct FallbackApiClient {
    base_url: String,
}

impl FallbackApiClient {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// `{base_url}/{episode}`, with the episode pushed as one path segment.
    pub fn endpoint(&self, episode: &str) -> Result<String, ProviderClientError> {
        let mut url = Url::parse(&self.base_url).map_err(|e| {
            ProviderClientError::InvalidConfig(format!("Invalid fallback base URL {}: {e}", self.base_url))
        })?;
        url.path_segments_mut()
            .map_err(|()| {
                ProviderClientError::InvalidConfig(format!("Fallback base URL {} cannot carry a path", self.base_url))
            })?
            .pop_if_empty()
            .push(episode);
        Ok(url.to_string())
    }

    /// Fetch the source list for one episode.
    pub async fn sources(
        &self,
        fetcher: &dyn HttpFetcher,
        episode: &str,
    ) -> Result<Vec<FallbackSource>, ProviderClientError> {
        let url = self.endpoint(episode)?;
        let body = fetcher.fetch(&url, &page_headers()).await?.into_body()?;
        let parsed: FallbackResponse = serde_json::from_str(&body)?;
        Ok(parsed.sources)
    }
}
