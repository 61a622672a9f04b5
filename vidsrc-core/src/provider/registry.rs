// Backend Registry
//
// Factory-based builder producing an immutable, name-keyed backend registry

use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::Arc;
use vidsrc_providers::fetch::HttpFetcher;

use super::{DirectLinkBackend, EmbeddedPlayerBackend, ExtractError, ExtractorBackend};
use crate::config::{BackendConfig, BackendKind};

/// Backend factory function type
pub type BackendFactory = Box<
    dyn Fn(&BackendConfig, Arc<dyn HttpFetcher>) -> Result<Arc<dyn ExtractorBackend>, ExtractError>
        + Send
        + Sync,
>;

/// Registered backends, in registration order.
///
/// Built once at startup and shared behind an `Arc`; there is no mutation
/// after [`RegistryBuilder::build`].
pub struct BackendRegistry {
    backends: IndexMap<String, Arc<dyn ExtractorBackend>>,
    default_backend: Option<String>,
}

impl BackendRegistry {
    /// Start a builder with the built-in backend kinds registered.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new().with_builtin_factories()
    }

    /// Build from configuration.
    ///
    /// `default_backend` falls back to the first configured backend.
    pub fn from_config(
        backends: &[BackendConfig],
        default_backend: Option<&str>,
        fetcher: Arc<dyn HttpFetcher>,
    ) -> Result<Self, ExtractError> {
        let mut builder = Self::builder();
        for config in backends {
            builder.create_backend(config, fetcher.clone())?;
        }
        if let Some(name) = default_backend {
            builder.default_backend(name);
        }
        builder.build()
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ExtractorBackend>> {
        self.backends.get(name).cloned()
    }

    pub fn default_name(&self) -> Option<&str> {
        self.default_backend.as_deref()
    }

    /// Backend used when a request names none.
    pub fn default_backend(&self) -> Option<Arc<dyn ExtractorBackend>> {
        self.default_name().and_then(|name| self.get(name))
    }

    /// Backend names in registration order
    pub fn names(&self) -> Vec<String> {
        self.backends.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn ExtractorBackend>)> {
        self.backends.iter().map(|(name, backend)| (name.as_str(), backend))
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}

/// Builder for [`BackendRegistry`]
///
/// Each backend kind registers a factory; configured backends are created
/// through the factory for their kind.
pub struct RegistryBuilder {
    factories: HashMap<BackendKind, BackendFactory>,
    backends: IndexMap<String, Arc<dyn ExtractorBackend>>,
    default_backend: Option<String>,
}

impl RegistryBuilder {
    /// Create new empty builder
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
            backends: IndexMap::new(),
            default_backend: None,
        }
    }

    /// Register the direct-link and embedded-player factories
    pub fn with_builtin_factories(mut self) -> Self {
        self.register_factory(
            BackendKind::DirectLink,
            Box::new(|config, fetcher| {
                Ok(Arc::new(DirectLinkBackend::new(&config.name, &config.page_url, fetcher)))
            }),
        );
        self.register_factory(
            BackendKind::EmbeddedPlayer,
            Box::new(|config, fetcher| {
                Ok(Arc::new(EmbeddedPlayerBackend::new(&config.name, &config.page_url, fetcher)))
            }),
        );
        self
    }

    /// Register (or replace) the factory for a backend kind
    pub fn register_factory(&mut self, kind: BackendKind, factory: BackendFactory) {
        self.factories.insert(kind, factory);
    }

    /// Create a backend from configuration and add it under its name
    pub fn create_backend(
        &mut self,
        config: &BackendConfig,
        fetcher: Arc<dyn HttpFetcher>,
    ) -> Result<&mut Self, ExtractError> {
        let factory = self.factories.get(&config.kind).ok_or_else(|| {
            ExtractError::InvalidConfig(format!("No factory registered for backend kind {}", config.kind))
        })?;
        let backend = factory(config, fetcher)?;
        self.add_backend(backend)
    }

    /// Add an already constructed backend
    pub fn add_backend(&mut self, backend: Arc<dyn ExtractorBackend>) -> Result<&mut Self, ExtractError> {
        let name = backend.name().to_string();
        if self.backends.contains_key(&name) {
            return Err(ExtractError::InvalidConfig(format!("Duplicate backend name: {name}")));
        }
        self.backends.insert(name, backend);
        Ok(self)
    }

    pub fn default_backend(&mut self, name: &str) -> &mut Self {
        self.default_backend = Some(name.to_string());
        self
    }

    pub fn build(self) -> Result<BackendRegistry, ExtractError> {
        let default_backend = match self.default_backend {
            Some(name) if !self.backends.contains_key(&name) => {
                return Err(ExtractError::InvalidConfig(format!("Unknown default backend: {name}")));
            }
            Some(name) => Some(name),
            None => self.backends.keys().next().cloned(),
        };

        Ok(BackendRegistry {
            backends: self.backends,
            default_backend,
        })
    }
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}
