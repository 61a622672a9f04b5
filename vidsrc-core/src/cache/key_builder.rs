//! Cache key builder
//!
//! Every key the engine writes goes through here:
//!
//! - `{prefix}:sources:{backend}:{episode}` for a best-default resolution
//! - `{prefix}:sources:{backend}:{episode}:{quality}` when a quality was requested
//! - `{prefix}:sources:sources:{episode}` for the all-sources fan-out

use crate::config::CacheConfig;

/// Backend component of the all-sources key. No backend may use this name.
pub const ALL_SOURCES: &str = "sources";

#[derive(Debug, Clone)]
pub struct KeyBuilder {
    prefix: String,
}

impl KeyBuilder {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    #[must_use]
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.key_prefix.clone())
    }

    /// Single-backend resolution
    #[must_use]
    pub fn sources(&self, backend: &str, episode: &str, quality: Option<&str>) -> String {
        match quality {
            Some(quality) => format!("{}:sources:{}:{}:{}", self.prefix, backend, episode, quality),
            None => format!("{}:sources:{}:{}", self.prefix, backend, episode),
        }
    }

    /// All-sources fan-out
    #[must_use]
    pub fn all_sources(&self, episode: &str) -> String {
        self.sources(ALL_SOURCES, episode, None)
    }
}

impl Default for KeyBuilder {
    fn default() -> Self {
        Self::new("vidsrc")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys() {
        let keys = KeyBuilder::new("test");
        assert_eq!(keys.sources("vidcdn", "ep-1", None), "test:sources:vidcdn:ep-1");
        assert_eq!(keys.sources("vidcdn", "ep-1", Some("720")), "test:sources:vidcdn:ep-1:720");
        assert_eq!(keys.all_sources("ep-1"), "test:sources:sources:ep-1");
    }

    #[test]
    fn test_default_prefix() {
        assert_eq!(KeyBuilder::default().all_sources("x"), "vidsrc:sources:sources:x");
    }
}
