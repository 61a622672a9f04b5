//! Upstream HTTP fetch
//!
//! The engine never talks to reqwest directly. Every page, embed and manifest
//! request goes through [`HttpFetcher`] so backends can be exercised without a
//! network and so timeouts and size limits live in one place.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::{ProviderClientError, MAX_RESPONSE_SIZE};

/// Browser-like user agent sent with every upstream request.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Request headers as plain name/value pairs.
pub type Headers = HashMap<String, String>;

/// Raw upstream response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    /// Final URL of the request
    pub url: String,
    /// HTTP status code
    pub status: u16,
    /// Body decoded as UTF-8 (lossy)
    pub body: String,
}

impl FetchResponse {
    #[must_use]
    pub fn new(url: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status,
            body: body.into(),
        }
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Return the body, or an `Http` error for any non-2xx status.
    pub fn into_body(self) -> Result<String, ProviderClientError> {
        self.into_parts().map(|(_, body)| body)
    }

    /// Final URL and body, or an `Http` error for any non-2xx status.
    ///
    /// Relative references in the body resolve against the final URL, which
    /// differs from the requested one after a redirect.
    pub fn into_parts(self) -> Result<(String, String), ProviderClientError> {
        if self.is_success() {
            Ok((self.url, self.body))
        } else {
            Err(ProviderClientError::Http {
                status: self.status,
                url: self.url,
            })
        }
    }
}

/// Fetch collaborator contract: `fetch(url, headers) -> {status, body}`.
///
/// Implementations own timeouts and may fail with transport or timeout
/// errors. They do not retry.
#[async_trait]
pub trait HttpFetcher: Send + Sync {
    async fn fetch(&self, url: &str, headers: &Headers) -> Result<FetchResponse, ProviderClientError>;
}

/// Settings for [`ReqwestFetcher`].
#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub user_agent: String,
    pub connect_timeout: Duration,
    pub timeout: Duration,
    pub max_body_bytes: usize,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            connect_timeout: Duration::from_secs(10),
            timeout: Duration::from_secs(20),
            max_body_bytes: MAX_RESPONSE_SIZE,
        }
    }
}

/// reqwest-backed fetcher with a pooled client.
#[derive(Clone)]
pub struct ReqwestFetcher {
    client: Client,
    max_body_bytes: usize,
}

impl ReqwestFetcher {
    pub fn new(settings: &FetchSettings) -> Result<Self, ProviderClientError> {
        let client = Client::builder()
            .user_agent(settings.user_agent.as_str())
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.timeout)
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| ProviderClientError::InvalidConfig(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            max_body_bytes: settings.max_body_bytes,
        })
    }
}

#[async_trait]
impl HttpFetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str, headers: &Headers) -> Result<FetchResponse, ProviderClientError> {
        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let final_url = response.url().to_string();

        if let Some(len) = response.content_length() {
            if len as usize > self.max_body_bytes {
                return Err(ProviderClientError::ResponseTooLarge {
                    size: len,
                    limit: self.max_body_bytes,
                });
            }
        }

        let bytes = response.bytes().await?;
        if bytes.len() > self.max_body_bytes {
            return Err(ProviderClientError::ResponseTooLarge {
                size: bytes.len() as u64,
                limit: self.max_body_bytes,
            });
        }

        tracing::trace!(url = %final_url, status, bytes = bytes.len(), "Upstream fetch complete");

        Ok(FetchResponse {
            url: final_url,
            status,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }
}

/// Headers for a page fetch.
#[must_use]
pub fn page_headers() -> Headers {
    Headers::new()
}

/// Headers for a manifest fetch: the originating page as referer.
#[must_use]
pub fn manifest_headers(referer: &str) -> Headers {
    let mut headers = Headers::new();
    headers.insert("Referer".to_string(), referer.to_string());
    headers
}
