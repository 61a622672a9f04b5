//! Quality selection
//!
//! Post-processing applied to an [`ExtractionResult`] before it is cached
//! or handed to a caller: placeholder removal, then either an exact quality
//! match or the best default.

use thiserror::Error;

use crate::models::{ExtractionResult, VideoSource, QUALITY_DEFAULT};

/// Quality picked by the best-default rule when present.
pub const PREFERRED_QUALITY: &str = "1080";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("No sources available")]
    Empty,

    #[error("Quality {requested} not available")]
    QualityNotAvailable {
        requested: String,
        available: Vec<String>,
    },
}

/// Drop the redundant `"default"` pointer once real variants exist.
///
/// When the result holds at least one numeric-quality entry, the first entry
/// tagged `"default"` is removed. A result with no numeric entry is returned
/// unchanged, since its placeholders are the only playable pointers.
#[must_use]
pub fn strip_placeholders(mut sources: ExtractionResult) -> ExtractionResult {
    if !sources.iter().any(VideoSource::has_numeric_quality) {
        return sources;
    }
    if let Some(idx) = sources.iter().position(|s| s.quality == QUALITY_DEFAULT) {
        sources.remove(idx);
    }
    sources
}

/// Pick one source.
///
/// With `requested`, the first exact quality-string match wins. Without it,
/// the first `"1080"` entry wins, else the first entry in discovery order.
pub fn select<'a>(sources: &'a [VideoSource], requested: Option<&str>) -> Result<&'a VideoSource, SelectionError> {
    if sources.is_empty() {
        return Err(SelectionError::Empty);
    }

    match requested {
        Some(quality) => sources
            .iter()
            .find(|s| s.quality == quality)
            .ok_or_else(|| SelectionError::QualityNotAvailable {
                requested: quality.to_string(),
                available: available_qualities(sources),
            }),
        None => Ok(sources
            .iter()
            .find(|s| s.quality == PREFERRED_QUALITY)
            .unwrap_or(&sources[0])),
    }
}

/// Distinct quality strings in discovery order.
#[must_use]
pub fn available_qualities(sources: &[VideoSource]) -> Vec<String> {
    let mut qualities: Vec<String> = Vec::with_capacity(sources.len());
    for source in sources {
        if !qualities.contains(&source.quality) {
            qualities.push(source.quality.clone());
        }
    }
    qualities
}
