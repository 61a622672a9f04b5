use serde::{Deserialize, Serialize};

/// Opaque identifier of one episode within one title.
///
/// The caller owns the format; the engine only uses it to build page URLs
/// and cache keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EpisodeRef(String);

impl EpisodeRef {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EpisodeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for EpisodeRef {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for EpisodeRef {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for EpisodeRef {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
