// Extractor Backend System
//
// Three-tier architecture:
//
// Tier 1: vidsrc-providers (Pure upstream HTTP clients)
//   - fetch::ReqwestFetcher, scrape tokenizers, fallback::FallbackApiClient
//   - No ExtractorBackend dependency
//
// Tier 2: vidsrc-core/provider (ExtractorBackend strategies)
//   - DirectLinkBackend, EmbeddedPlayerBackend, ApiFallbackBackend
//   - Use the tier 1 clients to implement ExtractorBackend
//
// Tier 3: vidsrc-core/aggregator
//   - ResolutionAggregator - cache, fan-out and the primary -> fallback chain
//   - Reads backends from the immutable BackendRegistry

// Core traits and types
pub mod error;
pub mod registry;
pub mod traits;

// Shared scraping steps
pub mod expand;

// ExtractorBackend implementations
pub mod direct_link;
pub mod embedded;
pub mod fallback;

pub use error::*;
pub use registry::*;
pub use traits::*;

pub use direct_link::DirectLinkBackend;
pub use embedded::EmbeddedPlayerBackend;
pub use fallback::{ApiFallbackBackend, FALLBACK_BACKEND_NAME};

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

use crate::models::EpisodeRef;

/// Placeholder substituted by the episode reference in backend page URLs.
pub const EPISODE_PLACEHOLDER: &str = "{episode}";

// Path-segment set plus the query delimiters, so the placeholder may sit in
// either the path or a query value.
const EPISODE_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'&')
    .add(b'+')
    .add(b'/')
    .add(b'<')
    .add(b'=')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Fill a backend page URL template with an episode reference.
///
/// The reference is opaque, so it is percent-encoded before substitution.
pub fn page_url(template: &str, episode: &EpisodeRef) -> String {
    let encoded = utf8_percent_encode(episode.as_str(), EPISODE_ENCODE_SET).to_string();
    template.replace(EPISODE_PLACEHOLDER, &encoded)
}
