// Extractor backend error types

use vidsrc_providers::ProviderClientError;

/// Failure of one backend invocation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    /// The page was fetched but held no parsable source reference
    #[error("No links found on {0}")]
    NoLinksFound(String),

    /// Network failure, timeout, non-2xx status or unreadable payload
    #[error("Upstream fetch failed: {0}")]
    UpstreamFetch(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<ProviderClientError> for ExtractError {
    fn from(err: ProviderClientError) -> Self {
        match err {
            ProviderClientError::InvalidConfig(msg) => Self::InvalidConfig(msg),
            other => Self::UpstreamFetch(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, ExtractError>;
