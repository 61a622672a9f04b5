use super::EpisodeRef;

/// One caller request against the aggregator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveRequest {
    pub episode: EpisodeRef,
    /// Backend name; the registry default when absent
    pub backend: Option<String>,
    /// Exact quality string wanted; best default when absent
    pub quality: Option<String>,
    /// Skip placeholder removal and bypass the cache
    pub raw: bool,
}

impl ResolveRequest {
    #[must_use]
    pub fn new(episode: impl Into<EpisodeRef>) -> Self {
        Self {
            episode: episode.into(),
            backend: None,
            quality: None,
            raw: false,
        }
    }

    #[must_use]
    pub fn with_backend(mut self, backend: impl Into<String>) -> Self {
        self.backend = Some(backend.into());
        self
    }

    #[must_use]
    pub fn with_quality(mut self, quality: impl Into<String>) -> Self {
        self.quality = Some(quality.into());
        self
    }

    #[must_use]
    pub const fn raw(mut self, raw: bool) -> Self {
        self.raw = raw;
        self
    }
}
