// Manifest expansion shared by the scraping backends

use futures::future::join_all;
use tracing::{debug, warn};
use vidsrc_providers::fetch::{manifest_headers, HttpFetcher};

use crate::manifest;
use crate::models::{ExtractionResult, VideoSource};

/// Append per-variant entries for every manifest among `sources`.
///
/// Manifests are fetched concurrently with `referer` as the originating page.
/// A manifest that cannot be fetched, or that is not a variant listing,
/// contributes nothing; the base entries are never touched.
pub async fn expand_manifests(fetcher: &dyn HttpFetcher, referer: &str, sources: &mut ExtractionResult) {
    let manifests: Vec<String> = sources
        .iter()
        .filter(|s| s.is_streaming_manifest)
        .map(|s| s.url.clone())
        .collect();
    if manifests.is_empty() {
        return;
    }

    let headers = manifest_headers(referer);
    let bodies = join_all(manifests.iter().map(|url| fetcher.fetch(url, &headers))).await;

    for (url, resp) in manifests.iter().zip(bodies) {
        let (base, body) = match resp.and_then(|resp| resp.into_parts()) {
            Ok(parts) => parts,
            Err(e) => {
                warn!(
                    manifest = %url,
                    error = %e,
                    transport = e.is_transport(),
                    "Manifest fetch failed, keeping base source only"
                );
                continue;
            }
        };

        let before = sources.len();
        sources.extend(manifest::parse_variants(&body, &base));
        debug!(manifest = %url, base = %base, variants = sources.len() - before, "Manifest expanded");
    }
}

/// Tag extracted links: first `"default"`, every later one `"backup"`.
pub fn tag_links(links: Vec<String>) -> ExtractionResult {
    links
        .into_iter()
        .enumerate()
        .map(|(i, url)| {
            let quality = if i == 0 {
                crate::models::QUALITY_DEFAULT
            } else {
                crate::models::QUALITY_BACKUP
            };
            let is_manifest = vidsrc_providers::scrape::is_manifest_url(&url);
            VideoSource::new(url, quality, is_manifest)
        })
        .collect()
}
