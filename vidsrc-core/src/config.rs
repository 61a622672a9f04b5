use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;
use vidsrc_providers::fetch::{FetchSettings, DEFAULT_USER_AGENT};

use crate::cache::ALL_SOURCES;
use crate::provider::{EPISODE_PLACEHOLDER, FALLBACK_BACKEND_NAME};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub fetch: FetchConfig,
    pub cache: CacheConfig,
    pub backends: Vec<BackendConfig>,
    /// Backend used when a request names none; the first backend otherwise
    pub default_backend: Option<String>,
    pub fallback: FallbackConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "pretty"
    pub file_path: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub user_agent: String,
    pub connect_timeout_seconds: u64,
    pub timeout_seconds: u64,
    pub max_body_bytes: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            connect_timeout_seconds: 10,
            timeout_seconds: 20,
            max_body_bytes: 16 * 1024 * 1024,
        }
    }
}

impl FetchConfig {
    #[must_use]
    pub fn to_settings(&self) -> FetchSettings {
        FetchSettings {
            user_agent: self.user_agent.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_seconds),
            timeout: Duration::from_secs(self.timeout_seconds),
            max_body_bytes: self.max_body_bytes,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub ttl_seconds: u64,
    pub l1_max_capacity: u64,
    pub key_prefix: String,
    /// Collapse concurrent misses on one key into a single resolution
    pub single_flight: bool,
    /// Shared L2 tier; L1 only when unset
    pub redis_url: Option<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_seconds: 3600,
            l1_max_capacity: 10_000,
            key_prefix: "vidsrc".to_string(),
            single_flight: false,
            redis_url: None,
        }
    }
}

impl CacheConfig {
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

/// Extraction strategy of a configured backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Listing page that links to one or more embed pages
    DirectLink,
    /// Single embed page with inline player links
    EmbeddedPlayer,
}

impl BackendKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::DirectLink => "direct_link",
            Self::EmbeddedPlayer => "embedded_player",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    pub name: String,
    pub kind: BackendKind,
    /// Page URL template containing `{episode}`
    pub page_url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    pub enabled: bool,
    pub base_url: String,
}

impl Config {
    /// Load configuration from multiple sources with priority:
    /// 1. Environment variables (highest priority)
    /// 2. Config file (if provided)
    /// 3. Defaults (lowest priority)
    pub fn load(config_file: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        // Load config file if provided
        if let Some(path) = config_file {
            if Path::new(path).exists() {
                builder = builder.add_source(File::with_name(path));
            }
        }

        // Override with environment variables (VIDSRC_CACHE__TTL_SECONDS, etc.)
        builder = builder.add_source(
            Environment::with_prefix("VIDSRC")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Load from environment variables only
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// Load from file path
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        Self::load(Some(path))
    }

    /// Check the whole configuration, reporting every problem found.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.backends.is_empty() {
            errors.push("At least one backend must be configured".to_string());
        }

        let mut seen: Vec<&str> = Vec::with_capacity(self.backends.len());
        for backend in &self.backends {
            let name = backend.name.trim();
            if name.is_empty() {
                errors.push("Backend name must not be empty".to_string());
                continue;
            }
            if name == ALL_SOURCES || name == FALLBACK_BACKEND_NAME {
                errors.push(format!("Backend name '{name}' is reserved"));
            }
            if seen.contains(&name) {
                errors.push(format!("Duplicate backend name '{name}'"));
            }
            seen.push(name);

            if !backend.page_url.contains(EPISODE_PLACEHOLDER) {
                errors.push(format!(
                    "Backend '{name}' page_url must contain {EPISODE_PLACEHOLDER}"
                ));
            }
            if url::Url::parse(&backend.page_url.replace(EPISODE_PLACEHOLDER, "x")).is_err() {
                errors.push(format!("Backend '{name}' page_url is not a valid URL"));
            }
        }

        if let Some(default) = &self.default_backend {
            if !self.backends.iter().any(|b| &b.name == default) {
                errors.push(format!("Default backend '{default}' is not configured"));
            }
        }

        if self.fallback.enabled && url::Url::parse(&self.fallback.base_url).is_err() {
            errors.push(format!(
                "Fallback base_url '{}' is not a valid URL",
                self.fallback.base_url
            ));
        }

        if self.fetch.timeout_seconds == 0 || self.fetch.connect_timeout_seconds == 0 {
            errors.push("Fetch timeouts must be greater than zero".to_string());
        }
        if self.fetch.max_body_bytes == 0 {
            errors.push("fetch.max_body_bytes must be greater than zero".to_string());
        }

        if self.cache.enabled {
            if self.cache.ttl_seconds == 0 {
                errors.push("cache.ttl_seconds must be greater than zero".to_string());
            }
            if self.cache.l1_max_capacity == 0 {
                errors.push("cache.l1_max_capacity must be greater than zero".to_string());
            }
            if let Some(redis_url) = &self.cache.redis_url {
                if let Err(e) = redis::Client::open(redis_url.as_str()) {
                    errors.push(format!("cache.redis_url is invalid: {e}"));
                }
            }
        }

        if crate::logging::parse_log_level(&self.logging.level).is_err() {
            errors.push(format!("Invalid log level '{}'", self.logging.level));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
