//! Startup wiring
//!
//! Configuration loading and construction of the fetcher, backend registry,
//! cache and aggregator from a validated [`Config`].

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use vidsrc_providers::fetch::{HttpFetcher, ReqwestFetcher};

use crate::aggregator::ResolutionAggregator;
use crate::cache::{CacheStore, KeyBuilder, MemoryCacheStore, RedisCacheStore, TieredCacheStore};
use crate::provider::{ApiFallbackBackend, BackendRegistry};
use crate::Config;

/// Load configuration from config file or environment variables
///
/// Config file search order:
/// 1. `explicit_path` (e.g. a `--config` flag)
/// 2. VIDSRC_CONFIG_PATH environment variable
/// 3. ./config.yaml (current working directory)
/// 4. Fall back to environment variables only
pub fn load_config(explicit_path: Option<&str>) -> Result<Config> {
    if let Some(path) = explicit_path {
        if !std::path::Path::new(path).exists() {
            anyhow::bail!("Config file {path} does not exist");
        }
    }

    let config_path = explicit_path
        .map(str::to_string)
        .or_else(|| {
            std::env::var("VIDSRC_CONFIG_PATH")
                .ok()
                .filter(|p| std::path::Path::new(p).exists())
        })
        .or_else(|| {
            let cwd = "config.yaml";
            std::path::Path::new(cwd).exists().then(|| cwd.to_string())
        });

    let config = match config_path {
        Some(path) => {
            Config::from_file(&path).with_context(|| format!("Failed to load config from {path}"))?
        }
        None => Config::from_env().context("Failed to load config from environment")?,
    };

    // Validate configuration (fail fast on misconfigurations)
    if let Err(errors) = config.validate() {
        for error in &errors {
            tracing::error!("Config validation error: {}", error);
        }
        return Err(anyhow::anyhow!(
            "Configuration validation failed with {} error(s): {}",
            errors.len(),
            errors.join("; ")
        ));
    }

    Ok(config)
}

pub fn build_fetcher(config: &Config) -> Result<Arc<dyn HttpFetcher>> {
    let fetcher = ReqwestFetcher::new(&config.fetch.to_settings()).context("Failed to build HTTP client")?;
    Ok(Arc::new(fetcher))
}

pub fn build_registry(config: &Config, fetcher: Arc<dyn HttpFetcher>) -> Result<BackendRegistry> {
    let registry = BackendRegistry::from_config(&config.backends, config.default_backend.as_deref(), fetcher)?;
    info!(
        backends = ?registry.names(),
        default = registry.default_name().unwrap_or("none"),
        "Backend registry built"
    );
    Ok(registry)
}

/// L1 moka store, fronting Redis when `cache.redis_url` is set.
///
/// `None` when caching is disabled.
pub async fn build_cache(config: &Config) -> Result<Option<Arc<dyn CacheStore>>> {
    if !config.cache.enabled {
        info!("Cache disabled");
        return Ok(None);
    }

    let ttl = Some(config.cache.ttl());
    let l1 = MemoryCacheStore::new(config.cache.l1_max_capacity, ttl);
    let l2: Option<Arc<dyn CacheStore>> = match &config.cache.redis_url {
        Some(url) => {
            let redis = RedisCacheStore::connect(url, ttl)
                .await
                .context("Failed to connect to Redis cache")?;
            Some(Arc::new(redis))
        }
        None => None,
    };

    info!(l2 = l2.is_some(), ttl_seconds = config.cache.ttl_seconds, "Cache initialized");
    Ok(Some(Arc::new(TieredCacheStore::new(l1, l2))))
}

/// Everything a caller needs to resolve sources.
pub async fn build_aggregator(config: &Config) -> Result<ResolutionAggregator> {
    let fetcher = build_fetcher(config)?;
    let registry = build_registry(config, fetcher.clone())?;

    let mut aggregator = ResolutionAggregator::new(Arc::new(registry));

    if let Some(cache) = build_cache(config).await? {
        aggregator = aggregator.with_cache(cache, KeyBuilder::from_config(&config.cache), config.cache.ttl());
        if config.cache.single_flight {
            aggregator = aggregator.with_single_flight();
        }
    }

    if config.fallback.enabled {
        aggregator = aggregator.with_fallback(Arc::new(ApiFallbackBackend::new(&config.fallback.base_url, fetcher)));
        info!(base_url = %config.fallback.base_url, "Fallback resolver enabled");
    }

    Ok(aggregator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BackendConfig, BackendKind};

    fn config() -> Config {
        Config {
            backends: vec![BackendConfig {
                name: "vidcdn".to_string(),
                kind: BackendKind::DirectLink,
                page_url: "https://site.example/{episode}".to_string(),
            }],
            ..Config::default()
        }
    }

    #[test]
    fn test_load_config_missing_explicit_path() {
        assert!(load_config(Some("/nonexistent/vidsrc.yaml")).is_err());
    }

    #[tokio::test]
    async fn test_build_aggregator_memory_only() {
        let aggregator = build_aggregator(&config()).await.unwrap();
        assert_eq!(aggregator.registry().names(), ["vidcdn"]);
    }

    #[tokio::test]
    async fn test_build_cache_disabled() {
        let mut config = config();
        config.cache.enabled = false;
        assert!(build_cache(&config).await.unwrap().is_none());
    }
}
