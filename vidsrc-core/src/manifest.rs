//! Adaptive-streaming manifest parser
//!
//! Expands a top-level HLS playlist into one [`VideoSource`] per variant
//! stream. Parsing is lazy: [`parse_variants`] returns an iterator that walks
//! the body as it is consumed.

use url::Url;

use crate::models::{VideoSource, QUALITY_UNKNOWN};

/// Marker every top-level manifest starts with.
pub const HEADER_MARKER: &str = "#EXTM3U";
/// Marker that opens each variant stream block.
pub const VARIANT_MARKER: &str = "#EXT-X-STREAM-INF:";

const MANIFEST_FILE_HINT: &str = ".m3u8";
const RESOLUTION_ATTR: &str = "RESOLUTION=";

/// Whether `body` is a top-level manifest at all.
#[must_use]
pub fn is_manifest(body: &str) -> bool {
    body.trim_start_matches('\u{feff}').trim_start().starts_with(HEADER_MARKER)
}

/// Parse the variant listing of a manifest fetched from `manifest_url`.
///
/// A body without the header marker yields an empty sequence. Variant paths
/// are resolved against the directory of `manifest_url`.
#[must_use]
pub fn parse_variants<'a>(body: &'a str, manifest_url: &str) -> ManifestVariants<'a> {
    let mut segments = body.split(VARIANT_MARKER);
    if is_manifest(body) {
        // Everything before the first variant marker is the playlist header.
        segments.next();
    } else {
        // Exhaust so the iterator is empty.
        segments.by_ref().for_each(drop);
    }

    ManifestVariants {
        segments,
        base: Url::parse(manifest_url).ok(),
        base_dir: directory_of(manifest_url),
    }
}

/// Lazy, finite, single-pass sequence of manifest variants.
pub struct ManifestVariants<'a> {
    segments: std::str::Split<'a, &'static str>,
    base: Option<Url>,
    base_dir: String,
}

impl Iterator for ManifestVariants<'_> {
    type Item = VideoSource;

    fn next(&mut self) -> Option<Self::Item> {
        for segment in self.segments.by_ref() {
            let mut lines = segment.lines().map(str::trim);
            let attributes = lines.next().unwrap_or_default();

            // Malformed: attribute line with no path after it.
            let Some(path) = lines.find(|l| !l.is_empty() && !l.starts_with('#')) else {
                continue;
            };
            if !path.contains(MANIFEST_FILE_HINT) {
                continue;
            }

            let quality = parse_height(attributes).unwrap_or(QUALITY_UNKNOWN);
            return Some(VideoSource::new(self.resolve(path), quality, true));
        }
        None
    }
}

impl ManifestVariants<'_> {
    fn resolve(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        if let Some(joined) = self.base.as_ref().and_then(|b| b.join(path).ok()) {
            return joined.to_string();
        }
        format!("{}{}", self.base_dir, path.trim_start_matches('/'))
    }
}

/// `RESOLUTION=<w>x<h>` -> `<h>`
fn parse_height(attributes: &str) -> Option<&str> {
    let start = attributes.find(RESOLUTION_ATTR)? + RESOLUTION_ATTR.len();
    let value = attributes[start..].split(',').next()?;
    let (_, height) = value.split_once(['x', 'X'])?;
    let height = height.trim();
    (!height.is_empty() && height.bytes().all(|b| b.is_ascii_digit())).then_some(height)
}

/// Everything up to and including the last `/` of the URL path.
fn directory_of(url: &str) -> String {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    match without_query.rfind('/') {
        Some(idx) => without_query[..=idx].to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MASTER: &str = "#EXTM3U\n\
#EXT-X-VERSION:3\n\
#EXT-X-STREAM-INF:BANDWIDTH=800000,RESOLUTION=640x360\n\
360/index.m3u8\n\
#EXT-X-STREAM-INF:BANDWIDTH=1600000,RESOLUTION=1280x720,CODECS=\"avc1.4d401f\"\n\
720/index.m3u8?token=abc\n\
#EXT-X-STREAM-INF:BANDWIDTH=4000000\n\
https://other.example/hd/index.m3u8\n";

    #[test]
    fn test_parse_variants_expands_each_segment() {
        let variants: Vec<_> =
            parse_variants(MASTER, "https://cdn.example/v/abc/master.m3u8?sig=1").collect();

        assert_eq!(
            variants,
            vec![
                VideoSource::new("https://cdn.example/v/abc/360/index.m3u8", "360", true),
                VideoSource::new("https://cdn.example/v/abc/720/index.m3u8?token=abc", "720", true),
                VideoSource::new("https://other.example/hd/index.m3u8", "unknown", true),
            ]
        );
        assert!(variants.iter().all(|v| v.is_streaming_manifest));
    }

    #[test]
    fn test_missing_header_yields_nothing() {
        let body = "#EXT-X-STREAM-INF:RESOLUTION=1280x720\n720.m3u8\n";
        assert_eq!(parse_variants(body, "https://cdn.example/master.m3u8").count(), 0);
        assert_eq!(parse_variants("<html>403</html>", "https://cdn.example/m.m3u8").count(), 0);
        assert_eq!(parse_variants("", "https://cdn.example/m.m3u8").count(), 0);
    }

    #[test]
    fn test_media_playlist_has_no_variants() {
        let body = "#EXTM3U\n#EXT-X-TARGETDURATION:10\n#EXTINF:10,\nseg0.ts\n#EXT-X-ENDLIST\n";
        assert_eq!(parse_variants(body, "https://cdn.example/index.m3u8").count(), 0);
    }

    #[test]
    fn test_malformed_segment_is_skipped() {
        let body = "#EXTM3U\n\
#EXT-X-STREAM-INF:RESOLUTION=1920x1080\n\
#EXT-X-STREAM-INF:RESOLUTION=854x480\n\
480.m3u8\n";

        let variants: Vec<_> = parse_variants(body, "https://cdn.example/a/master.m3u8").collect();
        assert_eq!(variants, vec![VideoSource::new("https://cdn.example/a/480.m3u8", "480", true)]);
    }

    #[test]
    fn test_non_manifest_variant_path_is_skipped() {
        let body = "#EXTM3U\n#EXT-X-STREAM-INF:RESOLUTION=1280x720\nvideo.mp4\n";
        assert_eq!(parse_variants(body, "https://cdn.example/master.m3u8").count(), 0);
    }

    #[test]
    fn test_iterator_is_lazy_and_single_pass() {
        let mut variants = parse_variants(MASTER, "https://cdn.example/master.m3u8");
        assert_eq!(variants.next().map(|v| v.quality), Some("360".to_string()));
        assert_eq!(variants.by_ref().count(), 2);
        assert!(variants.next().is_none());
    }

    #[test]
    fn test_crlf_and_bom() {
        let body = "\u{feff}#EXTM3U\r\n#EXT-X-STREAM-INF:RESOLUTION=1920x1080\r\nhd.m3u8\r\n";
        let variants: Vec<_> = parse_variants(body, "https://cdn.example/x/master.m3u8").collect();
        assert_eq!(variants[0].url, "https://cdn.example/x/hd.m3u8");
        assert_eq!(variants[0].quality, "1080");
    }

    #[test]
    fn test_parse_height() {
        assert_eq!(parse_height("BANDWIDTH=1,RESOLUTION=1920x1080"), Some("1080"));
        assert_eq!(parse_height("RESOLUTION=1280x720,FRAME-RATE=30"), Some("720"));
        assert_eq!(parse_height("BANDWIDTH=1"), None);
        assert_eq!(parse_height("RESOLUTION=bad"), None);
    }

    #[test]
    fn test_directory_of() {
        assert_eq!(directory_of("https://a.example/b/c/master.m3u8?x=/y"), "https://a.example/b/c/");
        assert_eq!(directory_of("master.m3u8"), "");
    }
}
