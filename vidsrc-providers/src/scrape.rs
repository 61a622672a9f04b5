//! Page tokenizers
//!
//! Narrow regex scanners for hosting pages. They know nothing about
//! fetching, so every pattern here is testable against a static string.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

// Constant patterns; Regex::new cannot fail on them.
static RE_IFRAME_SRC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<iframe[^>]*?\ssrc\s*=\s*["']([^"']+)["']"#).expect("invalid iframe regex")
});
static RE_DATA_VIDEO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)data-video\s*=\s*["']([^"']+)["']"#).expect("invalid data-video regex")
});
static RE_FILE_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"["']?\bfile\b["']?\s*:\s*["']((?:https?:)?(?:\\?/){2}[^"'\s]+)["']"#).expect("invalid file link regex")
});

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp", "svg", "ico"];
const MANIFEST_EXTENSION: &str = "m3u8";

/// Embed URLs advertised by a listing page, in page order, deduplicated.
///
/// Picks up `<iframe src=…>` and `data-video=…` attributes. Protocol-relative
/// and relative references are resolved against `page_url`.
#[must_use]
pub fn extract_embed_urls(html: &str, page_url: &str) -> Vec<String> {
    let base = Url::parse(page_url).ok();
    let mut found: Vec<(usize, String)> = RE_IFRAME_SRC
        .captures_iter(html)
        .chain(RE_DATA_VIDEO.captures_iter(html))
        .filter_map(|caps| caps.get(1))
        .filter_map(|m| absolutize(m.as_str(), base.as_ref()).map(|u| (m.start(), u)))
        .collect();

    // Two regex passes; restore document order before deduplicating.
    found.sort_by_key(|(pos, _)| *pos);

    let mut urls = Vec::with_capacity(found.len());
    for (_, url) in found {
        if !urls.contains(&url) {
            urls.push(url);
        }
    }
    urls
}

/// Quoted `file: "…"` references in an embed page, minus image links.
#[must_use]
pub fn extract_file_links(html: &str) -> Vec<String> {
    let mut links: Vec<String> = Vec::new();
    for caps in RE_FILE_LINK.captures_iter(html) {
        let Some(m) = caps.get(1) else { continue };
        let Some(link) = absolutize(&m.as_str().replace("\\/", "/"), None) else {
            continue;
        };
        if is_image_url(&link) || links.contains(&link) {
            continue;
        }
        links.push(link);
    }
    links
}

/// True when the URL path ends in a known image extension.
#[must_use]
pub fn is_image_url(url: &str) -> bool {
    path_extension(url).is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

/// True when the URL path ends in the adaptive-streaming manifest extension.
#[must_use]
pub fn is_manifest_url(url: &str) -> bool {
    path_extension(url).is_some_and(|ext| ext == MANIFEST_EXTENSION)
}

fn path_extension(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let last = path.rsplit('/').next()?;
    let (_, ext) = last.rsplit_once('.')?;
    Some(ext.to_ascii_lowercase())
}

fn absolutize(raw: &str, base: Option<&Url>) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if raw.starts_with("http://") || raw.starts_with("https://") {
        return Some(raw.to_string());
    }
    if let Some(rest) = raw.strip_prefix("//") {
        return Some(format!("https://{rest}"));
    }
    base.and_then(|b| b.join(raw).ok()).map(|u| u.to_string())
}
