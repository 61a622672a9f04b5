//! Prometheus metrics collection
//!
//! Counters live in a crate-local registry; [`gather_metrics`] renders them in the
//! text exposition format for whoever embeds the engine.

use prometheus::{register_counter_vec_with_registry, CounterVec, Encoder, Registry, TextEncoder};

/// Global metrics registry
pub static REGISTRY: std::sync::LazyLock<Registry> = std::sync::LazyLock::new(Registry::new);

/// Cache operations
pub mod cache {
    use super::{register_counter_vec_with_registry, CounterVec, REGISTRY};

    /// Cache hit counter
    pub static CACHE_HITS: std::sync::LazyLock<CounterVec> = std::sync::LazyLock::new(|| {
        register_counter_vec_with_registry!(
            "vidsrc_cache_hits_total",
            "Total number of cache hits",
            &["cache_type", "level"],
            REGISTRY.clone()
        ).expect("Failed to register CACHE_HITS")
    });

    /// Cache miss counter
    pub static CACHE_MISSES: std::sync::LazyLock<CounterVec> = std::sync::LazyLock::new(|| {
        register_counter_vec_with_registry!(
            "vidsrc_cache_misses_total",
            "Total number of cache misses",
            &["cache_type", "level"],
            REGISTRY.clone()
        ).expect("Failed to register CACHE_MISSES")
    });

    /// Cache invalidations counter
    pub static CACHE_INVALIDATIONS: std::sync::LazyLock<CounterVec> = std::sync::LazyLock::new(|| {
        register_counter_vec_with_registry!(
            "vidsrc_cache_invalidations_total",
            "Total number of cache invalidations",
            &["cache_type"],
            REGISTRY.clone()
        ).expect("Failed to register CACHE_INVALIDATIONS")
    });
}

/// Source resolution
pub mod resolution {
    use super::{register_counter_vec_with_registry, CounterVec, REGISTRY};

    /// Backend invocations by outcome (`ok`, `no_links`, `upstream_error`, `invalid_config`)
    pub static BACKEND_RESOLUTIONS: std::sync::LazyLock<CounterVec> = std::sync::LazyLock::new(|| {
        register_counter_vec_with_registry!(
            "vidsrc_backend_resolutions_total",
            "Total number of backend resolutions",
            &["backend", "outcome"],
            REGISTRY.clone()
        ).expect("Failed to register BACKEND_RESOLUTIONS")
    });

    /// Fallback invocations by outcome (`ok`, `exhausted`)
    pub static FALLBACK_RESOLUTIONS: std::sync::LazyLock<CounterVec> = std::sync::LazyLock::new(|| {
        register_counter_vec_with_registry!(
            "vidsrc_fallback_resolutions_total",
            "Total number of fallback resolutions",
            &["outcome"],
            REGISTRY.clone()
        ).expect("Failed to register FALLBACK_RESOLUTIONS")
    });
}

/// Render every registered metric in the Prometheus text format
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|_| prometheus::Error::Msg("Invalid UTF-8".to_string()))
}
