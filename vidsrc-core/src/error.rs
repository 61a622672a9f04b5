use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Cache error: {0}")]
    Cache(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Caller-facing resolution failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// The backend page yielded nothing parsable
    #[error("No sources found for episode {episode} on {backend}")]
    NoLinksFound { backend: String, episode: String },

    #[error("Quality {requested} is not available")]
    QualityNotAvailable {
        requested: String,
        available: Vec<String>,
    },

    /// Primary backend and fallback resolver both failed
    #[error("No source could be resolved for episode {episode}")]
    FallbackExhausted { episode: String },

    #[error("Unknown backend: {0}")]
    UnknownBackend(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error body returned to callers: `{ error, availableQualities? }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_qualities: Option<Vec<String>>,
}

impl ResolveError {
    /// Caller-facing payload. Internal details are logged, never returned.
    #[must_use]
    pub fn payload(&self) -> ErrorPayload {
        match self {
            Self::QualityNotAvailable { available, .. } => ErrorPayload {
                error: self.to_string(),
                available_qualities: Some(available.clone()),
            },
            Self::Internal(detail) => {
                tracing::error!("Internal error: {detail}");
                ErrorPayload {
                    error: "Internal error".to_string(),
                    available_qualities: None,
                }
            }
            other => ErrorPayload {
                error: other.to_string(),
                available_qualities: None,
            },
        }
    }
}
