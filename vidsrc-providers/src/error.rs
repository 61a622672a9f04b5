//! Shared provider client error types
//!
//! Common error enum used by the fetch collaborator, the scraping helpers
//! and the fallback API client.

use thiserror::Error;

/// Default maximum response body size for upstream fetches (16 MB).
pub const MAX_RESPONSE_SIZE: usize = 16 * 1024 * 1024;

/// Common error type for all upstream HTTP calls.
#[derive(Debug, Clone, Error)]
pub enum ProviderClientError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("HTTP error {status} for {url}")]
    Http { status: u16, url: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Response too large ({size} bytes, max {limit})")]
    ResponseTooLarge { size: u64, limit: usize },
}

impl ProviderClientError {
    /// Whether the error came from the transport or the upstream status
    /// rather than from interpreting a body we did receive.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Timeout(_) | Self::Http { .. } | Self::ResponseTooLarge { .. }
        )
    }
}

impl From<reqwest::Error> for ProviderClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ProviderClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}
