// vidsrc Provider Clients
//
// Pure upstream clients used by the resolution engine: the HTTP fetch
// collaborator, page tokenizers and the fallback API client. Nothing here
// knows about backends, caching or quality selection.
//
// Architecture:
// - vidsrc-providers: HTTP fetch + scraping + fallback API client
// - vidsrc-core/provider: ExtractorBackend implementations built on these
// - vidsrc-core/aggregator: cache, fan-out and fallback orchestration

pub mod error;
pub mod fallback;
pub mod fetch;
pub mod scrape;

pub use error::ProviderClientError;
pub use fallback::{FallbackApiClient, FallbackSource};
pub use fetch::{FetchResponse, FetchSettings, Headers, HttpFetcher, ReqwestFetcher};
