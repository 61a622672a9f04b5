//! Resolution aggregator
//!
//! Per request: cache check, backend resolution, quality selection, cache
//! write. A failed single-backend resolution gets exactly one fallback hop;
//! the all-sources operation fans out to every backend concurrently and
//! isolates each backend's failure in its own slot.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error, info, warn, Instrument};

use crate::cache::{CacheStore, KeyBuilder, SingleFlight};
use crate::error::ResolveError;
use crate::logging::generate_trace_id;
use crate::metrics::resolution::{BACKEND_RESOLUTIONS, FALLBACK_RESOLUTIONS};
use crate::models::{
    AllSources, BackendOutcome, CacheEntry, EpisodeRef, ExtractionResult, Resolution, ResolveRequest,
};
use crate::provider::{BackendRegistry, ExtractError, ExtractorBackend};
use crate::quality::{self, SelectionError};

/// Error marker shown in a fan-out slot whose backend could not be reached.
const UPSTREAM_UNAVAILABLE: &str = "Upstream source unavailable";
const BACKEND_FAILED: &str = "Backend failed";

/// Entry point for source resolution.
pub struct ResolutionAggregator {
    registry: Arc<BackendRegistry>,
    fallback: Option<Arc<dyn ExtractorBackend>>,
    cache: Option<Arc<dyn CacheStore>>,
    keys: KeyBuilder,
    ttl: Option<Duration>,
    resolve_flight: Option<SingleFlight<Resolution, ResolveError>>,
    all_flight: Option<SingleFlight<AllSources, ResolveError>>,
}

impl ResolutionAggregator {
    /// Aggregator with no cache, no fallback and no de-duplication.
    pub fn new(registry: Arc<BackendRegistry>) -> Self {
        Self {
            registry,
            fallback: None,
            cache: None,
            keys: KeyBuilder::default(),
            ttl: None,
            resolve_flight: None,
            all_flight: None,
        }
    }

    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn CacheStore>, keys: KeyBuilder, ttl: Duration) -> Self {
        self.cache = Some(cache);
        self.keys = keys;
        self.ttl = Some(ttl);
        self
    }

    #[must_use]
    pub fn with_fallback(mut self, fallback: Arc<dyn ExtractorBackend>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Collapse concurrent cache misses on one key into one resolution.
    #[must_use]
    pub fn with_single_flight(mut self) -> Self {
        self.resolve_flight = Some(SingleFlight::new());
        self.all_flight = Some(SingleFlight::new());
        self
    }

    pub fn registry(&self) -> &BackendRegistry {
        &self.registry
    }

    /// Resolve one episode through one backend (the default when unnamed).
    pub async fn resolve(&self, request: &ResolveRequest) -> Result<Resolution, ResolveError> {
        let span = tracing::info_span!(
            "resolve",
            trace_id = %generate_trace_id(),
            episode = %request.episode,
            backend = request.backend.as_deref().unwrap_or("default"),
        );
        self.resolve_inner(request).instrument(span).await
    }

    async fn resolve_inner(&self, request: &ResolveRequest) -> Result<Resolution, ResolveError> {
        let backend = match &request.backend {
            Some(name) => self
                .registry
                .get(name)
                .ok_or_else(|| ResolveError::UnknownBackend(name.clone()))?,
            None => self
                .registry
                .default_backend()
                .ok_or_else(|| ResolveError::Internal("No backends registered".to_string()))?,
        };

        // Raw results are never read from or written to the cache.
        if request.raw || self.cache.is_none() {
            return self.resolve_uncached(backend.as_ref(), request, None).await;
        }

        let key = self.keys.sources(
            backend.name(),
            request.episode.as_str(),
            request.quality.as_deref(),
        );
        if let Some(entry) = self.cache_get::<CacheEntry>(&key).await {
            debug!(key = %key, "Serving resolution from cache");
            return Ok(entry.into_resolution(request.quality.as_deref()));
        }

        let work = self.resolve_uncached(backend.as_ref(), request, Some(&key));
        match &self.resolve_flight {
            Some(flight) => flight.run(&key, work, leader_failed).await,
            None => work.await,
        }
    }

    /// Backend -> select -> cache write, with one fallback hop on upstream failure.
    async fn resolve_uncached(
        &self,
        backend: &dyn ExtractorBackend,
        request: &ResolveRequest,
        key: Option<&str>,
    ) -> Result<Resolution, ResolveError> {
        let result = backend.resolve(&request.episode).await;
        record_backend(backend.name(), &result);

        match result {
            Ok(sources) => {
                debug!(backend = %backend.name(), sources = sources.len(), "Backend resolved");
                let resolution = finish(sources, request, backend.name())?;
                if let Some(key) = key {
                    self.cache_put(key, &CacheEntry::from_resolution(&resolution)).await;
                }
                Ok(resolution)
            }
            Err(ExtractError::NoLinksFound(page)) => {
                debug!(backend = %backend.name(), page = %page, "Backend found no links");
                Err(ResolveError::NoLinksFound {
                    backend: backend.name().to_string(),
                    episode: request.episode.to_string(),
                })
            }
            Err(ExtractError::InvalidConfig(message)) => Err(ResolveError::Internal(format!(
                "Backend {} misconfigured: {message}",
                backend.name()
            ))),
            Err(ExtractError::UpstreamFetch(message)) => {
                warn!(backend = %backend.name(), error = %message, "Primary backend failed, trying fallback");
                self.resolve_fallback(request, key).await
            }
        }
    }

    async fn resolve_fallback(&self, request: &ResolveRequest, key: Option<&str>) -> Result<Resolution, ResolveError> {
        let outcome = match &self.fallback {
            Some(fallback) => match fallback.resolve(&request.episode).await {
                Ok(sources) => finish(sources, request, fallback.name()).map_err(|e| e.to_string()),
                Err(e) => Err(e.to_string()),
            },
            None => Err("fallback disabled".to_string()),
        };

        match outcome {
            Ok(resolution) => {
                FALLBACK_RESOLUTIONS.with_label_values(&["ok"]).inc();
                info!(episode = %request.episode, url = %resolution.source.url, "Resolved via fallback");
                if let Some(key) = key {
                    self.cache_put(key, &CacheEntry::from_resolution(&resolution)).await;
                }
                Ok(resolution)
            }
            Err(reason) => {
                FALLBACK_RESOLUTIONS.with_label_values(&["exhausted"]).inc();
                if let Some(key) = key {
                    self.cache_del(key).await;
                }
                error!(episode = %request.episode, reason = %reason, "Fallback exhausted");
                Err(ResolveError::FallbackExhausted {
                    episode: request.episode.to_string(),
                })
            }
        }
    }

    /// Resolve one episode through every registered backend concurrently.
    ///
    /// Each backend fills its own slot, keyed by name in registration order.
    /// The combined result is cached only when no slot holds an error.
    pub async fn resolve_all(&self, episode: &EpisodeRef, raw: bool) -> Result<AllSources, ResolveError> {
        let span = tracing::info_span!("resolve_all", trace_id = %generate_trace_id(), episode = %episode);
        self.resolve_all_inner(episode, raw).instrument(span).await
    }

    async fn resolve_all_inner(&self, episode: &EpisodeRef, raw: bool) -> Result<AllSources, ResolveError> {
        if raw || self.cache.is_none() {
            return Ok(self.fan_out(episode, raw).await);
        }

        let key = self.keys.all_sources(episode.as_str());
        if let Some(all) = self.cache_get::<AllSources>(&key).await {
            debug!(key = %key, "Serving all sources from cache");
            return Ok(all);
        }

        let work = async {
            let all = self.fan_out(episode, raw).await;
            let complete = !all.values().any(BackendOutcome::is_error);
            let usable = all.values().any(|o| o.sources().is_some_and(|s| !s.is_empty()));
            if complete && usable {
                self.cache_put(&key, &all).await;
            } else {
                debug!(key = %key, complete, usable, "Not caching all-sources result");
            }
            Ok(all)
        };
        match &self.all_flight {
            Some(flight) => flight.run(&key, work, leader_failed).await,
            None => work.await,
        }
    }

    async fn fan_out(&self, episode: &EpisodeRef, raw: bool) -> AllSources {
        let handles: Vec<_> = self
            .registry
            .iter()
            .map(|(name, backend)| {
                let backend = Arc::clone(backend);
                let episode = episode.clone();
                let task = async move { backend.resolve(&episode).await }.in_current_span();
                (name.to_string(), tokio::spawn(task))
            })
            .collect();

        let mut all = AllSources::with_capacity(handles.len());
        for (name, handle) in handles {
            let outcome = match handle.await {
                Ok(result) => {
                    record_backend(&name, &result);
                    match result {
                        Ok(sources) if raw => BackendOutcome::Sources(sources),
                        Ok(sources) => BackendOutcome::Sources(quality::strip_placeholders(sources)),
                        Err(ExtractError::NoLinksFound(_)) => BackendOutcome::Sources(Vec::new()),
                        Err(e) => {
                            warn!(backend = %name, error = %e, "Backend failed during fan-out");
                            BackendOutcome::Error {
                                error: match e {
                                    ExtractError::UpstreamFetch(_) => UPSTREAM_UNAVAILABLE.to_string(),
                                    _ => BACKEND_FAILED.to_string(),
                                },
                            }
                        }
                    }
                }
                Err(join_err) => {
                    warn!(backend = %name, error = %join_err, "Backend task aborted during fan-out");
                    BackendOutcome::Error {
                        error: BACKEND_FAILED.to_string(),
                    }
                }
            };
            all.insert(name, outcome);
        }
        all
    }

    /// Read and decode a cache entry. Store faults and undecodable entries
    /// count as misses.
    async fn cache_get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let cache = self.cache.as_ref()?;
        let bytes = match cache.get(key).await {
            Ok(bytes) => bytes?,
            Err(e) => {
                warn!(key = %key, error = %e, "Cache read failed, treating as miss");
                return None;
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key = %key, error = %e, "Discarding undecodable cache entry");
                None
            }
        }
    }

    async fn cache_put<T: Serialize>(&self, key: &str, value: &T) {
        let Some(cache) = &self.cache else { return };
        let bytes = match serde_json::to_vec(value) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to encode cache entry");
                return;
            }
        };
        if let Err(e) = cache.set(key, bytes, self.ttl).await {
            warn!(key = %key, error = %e, "Cache write failed");
        }
    }

    async fn cache_del(&self, key: &str) {
        let Some(cache) = &self.cache else { return };
        if let Err(e) = cache.del(key).await {
            warn!(key = %key, error = %e, "Cache invalidation failed");
        }
    }
}

/// Placeholder removal (unless raw) and selection.
fn finish(sources: ExtractionResult, request: &ResolveRequest, backend: &str) -> Result<Resolution, ResolveError> {
    let sources = if request.raw {
        sources
    } else {
        quality::strip_placeholders(sources)
    };

    let source = match quality::select(&sources, request.quality.as_deref()) {
        Ok(source) => source.clone(),
        Err(SelectionError::Empty) => {
            return Err(ResolveError::NoLinksFound {
                backend: backend.to_string(),
                episode: request.episode.to_string(),
            })
        }
        Err(SelectionError::QualityNotAvailable { requested, available }) => {
            return Err(ResolveError::QualityNotAvailable { requested, available })
        }
    };

    Ok(Resolution {
        source,
        qualities: sources,
    })
}

fn record_backend(backend: &str, result: &Result<ExtractionResult, ExtractError>) {
    let outcome = match result {
        Ok(_) => "ok",
        Err(ExtractError::NoLinksFound(_)) => "no_links",
        Err(ExtractError::UpstreamFetch(_)) => "upstream_error",
        Err(ExtractError::InvalidConfig(_)) => "invalid_config",
    };
    BACKEND_RESOLUTIONS.with_label_values(&[backend, outcome]).inc();
}

fn leader_failed() -> ResolveError {
    ResolveError::Internal("Concurrent resolution was abandoned".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{MemoryCacheStore, MockCacheStore};
    use crate::provider::RegistryBuilder;
    use crate::test_helpers::{src, ScriptedBackend};
    use mockall::predicate::eq;

    fn registry(backends: Vec<Arc<ScriptedBackend>>) -> Arc<BackendRegistry> {
        let mut builder = RegistryBuilder::new();
        for backend in backends {
            builder.add_backend(backend).unwrap();
        }
        Arc::new(builder.build().unwrap())
    }

    fn memory() -> Arc<MemoryCacheStore> {
        Arc::new(MemoryCacheStore::new(100, None))
    }

    fn cached(aggregator: ResolutionAggregator, cache: Arc<dyn CacheStore>) -> ResolutionAggregator {
        aggregator.with_cache(cache, KeyBuilder::new("test"), Duration::from_secs(60))
    }

    fn expanded() -> Vec<crate::models::VideoSource> {
        vec![
            src("https://cdn.example/master.m3u8", "default"),
            src("https://mirror.example/v.mp4", "backup"),
            src("https://cdn.example/1080.m3u8", "1080"),
            src("https://cdn.example/720.m3u8", "720"),
        ]
    }

    fn upstream_down() -> ExtractError {
        ExtractError::UpstreamFetch("HTTP 503 from https://site.example/ep-1".to_string())
    }

    #[tokio::test]
    async fn test_resolve_selects_and_strips() {
        let primary = ScriptedBackend::ok("vidcdn", expanded());
        let aggregator = ResolutionAggregator::new(registry(vec![primary]));

        let resolution = aggregator.resolve(&ResolveRequest::new("ep-1")).await.unwrap();
        assert_eq!(resolution.source.url, "https://cdn.example/1080.m3u8");
        let qualities: Vec<_> = resolution.qualities.iter().map(|s| s.quality.as_str()).collect();
        assert_eq!(qualities, ["backup", "1080", "720"]);

        let resolution = aggregator
            .resolve(&ResolveRequest::new("ep-1").with_quality("720"))
            .await
            .unwrap();
        assert_eq!(resolution.source.url, "https://cdn.example/720.m3u8");
    }

    #[tokio::test]
    async fn test_cache_hit_skips_backend() {
        let primary = ScriptedBackend::ok("vidcdn", expanded());
        let cache = memory();
        let aggregator = cached(ResolutionAggregator::new(registry(vec![primary.clone()])), cache.clone());

        let first = aggregator.resolve(&ResolveRequest::new("ep-1")).await.unwrap();
        let second = aggregator.resolve(&ResolveRequest::new("ep-1")).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(primary.calls(), 1);
        assert!(cache.get("test:sources:vidcdn:ep-1").await.unwrap().is_some());

        // A requested quality is a different key.
        aggregator
            .resolve(&ResolveRequest::new("ep-1").with_quality("720"))
            .await
            .unwrap();
        assert_eq!(primary.calls(), 2);
        assert!(cache.get("test:sources:vidcdn:ep-1:720").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_quality_not_available_skips_fallback() {
        let primary = ScriptedBackend::ok(
            "vidcdn",
            vec![src("https://cdn.example/1080.m3u8", "1080"), src("https://cdn.example/720.m3u8", "720")],
        );
        let fallback = ScriptedBackend::ok("fallback", vec![src("https://f.example/4k.m3u8", "4k")]);
        let aggregator = ResolutionAggregator::new(registry(vec![primary])).with_fallback(fallback.clone());

        let err = aggregator
            .resolve(&ResolveRequest::new("ep-1").with_quality("4k"))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ResolveError::QualityNotAvailable {
                requested: "4k".to_string(),
                available: vec!["1080".to_string(), "720".to_string()],
            }
        );
        assert_eq!(fallback.calls(), 0);
    }

    #[tokio::test]
    async fn test_no_links_is_not_retried_or_cached() {
        let primary = ScriptedBackend::failing("vidcdn", ExtractError::NoLinksFound("page".to_string()));
        let fallback = ScriptedBackend::ok("fallback", vec![src("https://f.example/v.mp4", "720")]);
        let cache = memory();
        let aggregator = cached(
            ResolutionAggregator::new(registry(vec![primary])).with_fallback(fallback.clone()),
            cache.clone(),
        );

        let err = aggregator.resolve(&ResolveRequest::new("ep-1")).await.unwrap_err();
        assert_eq!(
            err,
            ResolveError::NoLinksFound {
                backend: "vidcdn".to_string(),
                episode: "ep-1".to_string(),
            }
        );
        assert_eq!(fallback.calls(), 0);
        assert_eq!(cache.get("test:sources:vidcdn:ep-1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_fallback_success_cached_under_primary_key() {
        let primary = ScriptedBackend::failing("vidcdn", upstream_down());
        let fallback = ScriptedBackend::ok(
            "fallback",
            vec![src("https://f.example/1080.m3u8", "1080"), src("https://f.example/480.m3u8", "480")],
        );
        let cache = memory();
        let aggregator = cached(
            ResolutionAggregator::new(registry(vec![primary.clone()])).with_fallback(fallback.clone()),
            cache.clone(),
        );

        let resolution = aggregator.resolve(&ResolveRequest::new("ep-1")).await.unwrap();
        assert_eq!(resolution.source.url, "https://f.example/1080.m3u8");

        let bytes = cache.get("test:sources:vidcdn:ep-1").await.unwrap().unwrap();
        let entry: CacheEntry = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(entry.video_url, "https://f.example/1080.m3u8");

        aggregator.resolve(&ResolveRequest::new("ep-1")).await.unwrap();
        assert_eq!(primary.calls(), 1);
        assert_eq!(fallback.calls(), 1);
    }

    #[tokio::test]
    async fn test_fallback_exhausted_invalidates_key() {
        let mut store = MockCacheStore::new();
        store.expect_get().returning(|_| Ok(None));
        store.expect_set().never();
        store
            .expect_del()
            .with(eq("test:sources:vidcdn:ep-1:720"))
            .times(1)
            .returning(|_| Ok(()));

        let primary = ScriptedBackend::failing("vidcdn", upstream_down());
        // Fallback answers, but not with the requested quality.
        let fallback = ScriptedBackend::ok("fallback", vec![src("https://f.example/480.m3u8", "480")]);
        let aggregator = cached(
            ResolutionAggregator::new(registry(vec![primary])).with_fallback(fallback.clone()),
            Arc::new(store),
        );

        let err = aggregator
            .resolve(&ResolveRequest::new("ep-1").with_quality("720"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ResolveError::FallbackExhausted {
                episode: "ep-1".to_string()
            }
        );
        assert_eq!(fallback.calls(), 1);
    }

    #[tokio::test]
    async fn test_no_fallback_configured() {
        let primary = ScriptedBackend::failing("vidcdn", upstream_down());
        let aggregator = ResolutionAggregator::new(registry(vec![primary]));

        let err = aggregator.resolve(&ResolveRequest::new("ep-1")).await.unwrap_err();
        assert!(matches!(err, ResolveError::FallbackExhausted { .. }));
    }

    #[tokio::test]
    async fn test_unknown_backend() {
        let aggregator = ResolutionAggregator::new(registry(vec![ScriptedBackend::ok("vidcdn", expanded())]));
        let err = aggregator
            .resolve(&ResolveRequest::new("ep-1").with_backend("nope"))
            .await
            .unwrap_err();
        assert_eq!(err, ResolveError::UnknownBackend("nope".to_string()));
    }

    #[tokio::test]
    async fn test_raw_bypasses_cache_and_keeps_placeholders() {
        // Any cache call would panic: no expectations are set.
        let store = MockCacheStore::new();
        let primary = ScriptedBackend::ok("vidcdn", expanded());
        let aggregator = cached(ResolutionAggregator::new(registry(vec![primary])), Arc::new(store));

        let resolution = aggregator
            .resolve(&ResolveRequest::new("ep-1").raw(true))
            .await
            .unwrap();
        assert_eq!(resolution.qualities.len(), 4);
        assert_eq!(resolution.qualities[0].quality, "default");

        let all = aggregator.resolve_all(&EpisodeRef::from("ep-1"), true).await.unwrap();
        assert_eq!(all["vidcdn"].sources().map(<[_]>::len), Some(4));
    }

    #[tokio::test]
    async fn test_cache_faults_do_not_fail_resolution() {
        let mut store = MockCacheStore::new();
        store
            .expect_get()
            .returning(|_| Err(crate::Error::Cache("connection refused".to_string())));
        store
            .expect_set()
            .times(1)
            .returning(|_, _, _| Err(crate::Error::Cache("connection refused".to_string())));

        let aggregator = cached(
            ResolutionAggregator::new(registry(vec![ScriptedBackend::ok("vidcdn", expanded())])),
            Arc::new(store),
        );
        assert!(aggregator.resolve(&ResolveRequest::new("ep-1")).await.is_ok());
    }

    #[tokio::test]
    async fn test_fan_out_isolates_failures_and_skips_cache() {
        let mut store = MockCacheStore::new();
        store.expect_get().times(1).returning(|_| Ok(None));
        store.expect_set().never();

        let x = ScriptedBackend::ok("x", expanded());
        let y = ScriptedBackend::failing("y", upstream_down());
        let aggregator = cached(ResolutionAggregator::new(registry(vec![x, y])), Arc::new(store));

        let all = aggregator.resolve_all(&EpisodeRef::from("ep-1"), false).await.unwrap();

        assert_eq!(all.keys().collect::<Vec<_>>(), ["x", "y"]);
        assert_eq!(all["x"].sources().map(<[_]>::len), Some(3));
        assert_eq!(
            all["y"],
            BackendOutcome::Error {
                error: UPSTREAM_UNAVAILABLE.to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_fan_out_complete_result_is_cached() {
        let x = ScriptedBackend::ok("x", expanded());
        let y = ScriptedBackend::failing("y", ExtractError::NoLinksFound("page".to_string()));
        let cache = memory();
        let aggregator = cached(
            ResolutionAggregator::new(registry(vec![x.clone(), y.clone()])),
            cache.clone(),
        );
        let episode = EpisodeRef::from("ep-1");

        let first = aggregator.resolve_all(&episode, false).await.unwrap();
        assert_eq!(first["y"], BackendOutcome::Sources(Vec::new()));
        assert!(cache.get("test:sources:sources:ep-1").await.unwrap().is_some());

        let second = aggregator.resolve_all(&episode, false).await.unwrap();
        assert_eq!(first, second);
        assert_eq!((x.calls(), y.calls()), (1, 1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fan_out_runs_backends_concurrently() {
        let delay = Duration::from_millis(500);
        let backends = (0..4)
            .map(|i| ScriptedBackend::slow(&format!("b{i}"), expanded(), delay))
            .collect();
        let aggregator = ResolutionAggregator::new(registry(backends));

        let started = tokio::time::Instant::now();
        let all = aggregator.resolve_all(&EpisodeRef::from("ep-1"), false).await.unwrap();

        assert_eq!(all.len(), 4);
        assert!(started.elapsed() < delay * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_flight_collapses_concurrent_misses() {
        let primary = ScriptedBackend::slow("vidcdn", expanded(), Duration::from_millis(100));
        let aggregator = cached(ResolutionAggregator::new(registry(vec![primary.clone()])), memory())
            .with_single_flight();

        let request = ResolveRequest::new("ep-1");
        let results = futures::future::join_all((0..5).map(|_| aggregator.resolve(&request))).await;

        assert!(results.iter().all(Result::is_ok));
        assert_eq!(primary.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_without_single_flight_misses_resolve_independently() {
        let primary = ScriptedBackend::slow("vidcdn", expanded(), Duration::from_millis(100));
        let aggregator = cached(ResolutionAggregator::new(registry(vec![primary.clone()])), memory());

        let request = ResolveRequest::new("ep-1");
        futures::future::join_all((0..3).map(|_| aggregator.resolve(&request))).await;

        assert_eq!(primary.calls(), 3);
    }
}
