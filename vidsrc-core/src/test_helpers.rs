//! Test fakes shared by unit tests
//!
//! Network-free stand-ins for the fetch collaborator and for extractor
//! backends.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use vidsrc_providers::fetch::{FetchResponse, Headers, HttpFetcher};
use vidsrc_providers::ProviderClientError;

use crate::models::{EpisodeRef, ExtractionResult, VideoSource};
use crate::provider::{ExtractError, ExtractorBackend};

/// In-memory fetcher: URL -> canned response. Unknown URLs fail as network
/// errors.
#[derive(Default)]
pub struct StaticFetcher {
    routes: HashMap<String, Result<FetchResponse, ProviderClientError>>,
    requests: Mutex<Vec<(String, Headers)>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, body: &str) -> Self {
        self.routes
            .insert(url.to_string(), Ok(FetchResponse::new(url, 200, body)));
        self
    }

    /// `url` answers with `body` after redirecting to `final_url`.
    pub fn redirect(mut self, url: &str, final_url: &str, body: &str) -> Self {
        self.routes
            .insert(url.to_string(), Ok(FetchResponse::new(final_url, 200, body)));
        self
    }

    pub fn status(mut self, url: &str, status: u16) -> Self {
        self.routes
            .insert(url.to_string(), Ok(FetchResponse::new(url, status, "")));
        self
    }

    pub fn timeout(mut self, url: &str) -> Self {
        self.routes.insert(
            url.to_string(),
            Err(ProviderClientError::Timeout(format!("{url} timed out"))),
        );
        self
    }

    /// Every request seen so far, in order.
    pub fn requests(&self) -> Vec<(String, Headers)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpFetcher for StaticFetcher {
    async fn fetch(&self, url: &str, headers: &Headers) -> Result<FetchResponse, ProviderClientError> {
        self.requests
            .lock()
            .unwrap()
            .push((url.to_string(), headers.clone()));
        self.routes
            .get(url)
            .cloned()
            .unwrap_or_else(|| Err(ProviderClientError::Network(format!("no route to {url}"))))
    }
}

/// Backend returning a fixed outcome and counting invocations.
pub struct ScriptedBackend {
    name: String,
    outcome: Result<ExtractionResult, ExtractError>,
    delay: Duration,
    calls: AtomicUsize,
}

impl ScriptedBackend {
    pub fn ok(name: &str, sources: Vec<VideoSource>) -> Arc<Self> {
        Arc::new(Self::new(name, Ok(sources)))
    }

    pub fn failing(name: &str, err: ExtractError) -> Arc<Self> {
        Arc::new(Self::new(name, Err(err)))
    }

    pub fn slow(name: &str, sources: Vec<VideoSource>, delay: Duration) -> Arc<Self> {
        let mut backend = Self::new(name, Ok(sources));
        backend.delay = delay;
        Arc::new(backend)
    }

    fn new(name: &str, outcome: Result<ExtractionResult, ExtractError>) -> Self {
        Self {
            name: name.to_string(),
            outcome,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExtractorBackend for ScriptedBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn resolve(&self, _episode: &EpisodeRef) -> Result<ExtractionResult, ExtractError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.outcome.clone()
    }
}

pub fn src(url: &str, quality: &str) -> VideoSource {
    VideoSource::new(url, quality, vidsrc_providers::scrape::is_manifest_url(url))
}
