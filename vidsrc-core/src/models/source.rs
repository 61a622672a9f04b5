use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Placeholder tag for a backend's primary pick
pub const QUALITY_DEFAULT: &str = "default";
/// Placeholder tag for every alternate pointer after the primary pick
pub const QUALITY_BACKUP: &str = "backup";
/// Manifest variant without a `RESOLUTION` attribute
pub const QUALITY_UNKNOWN: &str = "unknown";

/// One playable stream location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSource {
    pub url: String,
    /// `"default"`, `"backup"`, `"unknown"` or a vertical resolution such as `"1080"`
    pub quality: String,
    #[serde(rename = "isM3U8")]
    pub is_streaming_manifest: bool,
}

impl VideoSource {
    #[must_use]
    pub fn new(url: impl Into<String>, quality: impl Into<String>, is_streaming_manifest: bool) -> Self {
        Self {
            url: url.into(),
            quality: quality.into(),
            is_streaming_manifest,
        }
    }

    /// Quality is a resolution rather than a label.
    #[must_use]
    pub fn has_numeric_quality(&self) -> bool {
        !self.quality.is_empty() && self.quality.bytes().all(|b| b.is_ascii_digit())
    }

    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.quality == QUALITY_DEFAULT || self.quality == QUALITY_BACKUP
    }
}

/// Ordered sources from one backend invocation; the first entry is the
/// backend's primary pick.
pub type ExtractionResult = Vec<VideoSource>;

/// Cached form of a single-backend resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub video_url: String,
    pub qualities: Vec<VideoSource>,
}

impl CacheEntry {
    #[must_use]
    pub fn from_resolution(resolution: &Resolution) -> Self {
        Self {
            video_url: resolution.source.url.clone(),
            qualities: resolution.qualities.clone(),
        }
    }

    /// Rebuild the caller-facing resolution.
    ///
    /// The selected source is looked up by URL among the cached qualities.
    /// Entries sharing that URL are told apart the way selection does: the
    /// requested quality, else the preferred one.
    #[must_use]
    pub fn into_resolution(self, requested_quality: Option<&str>) -> Resolution {
        let wanted = requested_quality.unwrap_or(crate::quality::PREFERRED_QUALITY);
        let by_url = |s: &&VideoSource| s.url == self.video_url;
        let source = self
            .qualities
            .iter()
            .filter(by_url)
            .find(|s| s.quality == wanted)
            .or_else(|| self.qualities.iter().find(by_url))
            .cloned()
            .unwrap_or_else(|| {
                VideoSource::new(
                    self.video_url.clone(),
                    requested_quality.unwrap_or(QUALITY_UNKNOWN),
                    vidsrc_providers::scrape::is_manifest_url(&self.video_url),
                )
            });

        Resolution {
            source,
            qualities: self.qualities,
        }
    }
}

/// Caller-facing result of a single-backend resolution: the selected source
/// plus every quality that remained after selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    #[serde(flatten)]
    pub source: VideoSource,
    pub qualities: Vec<VideoSource>,
}

/// Per-backend slot of an "all sources" fan-out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BackendOutcome {
    Sources(ExtractionResult),
    Error { error: String },
}

impl BackendOutcome {
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    #[must_use]
    pub fn sources(&self) -> Option<&[VideoSource]> {
        match self {
            Self::Sources(sources) => Some(sources),
            Self::Error { .. } => None,
        }
    }
}

/// Backend name to outcome, in registry order.
pub type AllSources = IndexMap<String, BackendOutcome>;
